use chrono::{DateTime, Utc};
use rand::Rng;

const SESSION_ID_PREFIX: &str = "session_";
const SESSION_SUFFIX_LEN: usize = 7;
const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    session_id: String,
    created_at: DateTime<Utc>,
}

impl SessionIdentity {
    pub fn create() -> Self {
        Self::create_with(Utc::now(), &mut rand::thread_rng())
    }

    pub fn create_with<R>(now: DateTime<Utc>, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let session_id = format!(
            "{SESSION_ID_PREFIX}{}_{}",
            now.timestamp_millis(),
            random_base36(rng, SESSION_SUFFIX_LEN)
        );

        Self {
            session_id,
            created_at: now,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn random_base36<R>(rng: &mut R, len: usize) -> String
where
    R: Rng + ?Sized,
{
    (0..len)
        .map(|_| char::from(BASE36_ALPHABET[rng.gen_range(0..BASE36_ALPHABET.len())]))
        .collect()
}

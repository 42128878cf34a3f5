use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMode {
    Guest,
    Admin,
}

impl ConsoleMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub mode: ConsoleMode,
    pub guest_token: Option<String>,
    pub guest_name: Option<String>,
    pub wedding_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("--guest-token is required unless --admin is set")]
    MissingGuestToken,
    #[error("--wedding-id is only supported with --admin")]
    WeddingIdRequiresAdmin,
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut admin = false;
        let mut guest_token = None;
        let mut guest_name = None;
        let mut wedding_id = None;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--admin" => admin = true,
                "--guest-token" => guest_token = Some(required_value(&mut iter, &arg)?),
                "--guest-name" => guest_name = Some(required_value(&mut iter, &arg)?),
                "--wedding-id" => wedding_id = Some(required_value(&mut iter, &arg)?),
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        if !admin && guest_token.is_none() {
            return Err(CliError::MissingGuestToken);
        }
        if !admin && wedding_id.is_some() {
            return Err(CliError::WeddingIdRequiresAdmin);
        }

        Ok(Self {
            mode: if admin {
                ConsoleMode::Admin
            } else {
                ConsoleMode::Guest
            },
            guest_token,
            guest_name,
            wedding_id,
        })
    }
}

fn required_value<I>(iter: &mut I, arg: &str) -> Result<String, CliError>
where
    I: Iterator<Item = String>,
{
    iter.next()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && !value.starts_with("--"))
        .ok_or_else(|| CliError::MissingValue(arg.to_string()))
}

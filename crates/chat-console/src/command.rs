use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open,
    Minimize,
    Restore,
    Close,
    Quick(usize),
    Rate { index: usize, helpful: bool },
    History,
    Logs,
    Help,
    Quit,
    Say(String),
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

const QUICK_USAGE: &str = "/quick <number>";
const RATE_USAGE: &str = "/rate <message index> up|down";

// Quick question numbers are 1-based as printed; the returned index is 0-based.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args = parts.collect::<Vec<_>>();

    match (name, args.as_slice()) {
        ("open", []) => Ok(Command::Open),
        ("minimize" | "min", []) => Ok(Command::Minimize),
        ("restore", []) => Ok(Command::Restore),
        ("close", []) => Ok(Command::Close),
        ("history", []) => Ok(Command::History),
        ("logs", []) => Ok(Command::Logs),
        ("help", []) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        ("quick", [number]) => number
            .parse::<usize>()
            .ok()
            .and_then(|number| number.checked_sub(1))
            .map(Command::Quick)
            .ok_or(CommandError::Usage(QUICK_USAGE)),
        ("quick", _) => Err(CommandError::Usage(QUICK_USAGE)),
        ("rate", [index, verdict]) => {
            let index = index
                .parse::<usize>()
                .map_err(|_| CommandError::Usage(RATE_USAGE))?;
            let helpful = match verdict.to_ascii_lowercase().as_str() {
                "up" | "yes" | "helpful" => true,
                "down" | "no" | "unhelpful" => false,
                _ => return Err(CommandError::Usage(RATE_USAGE)),
            };
            Ok(Command::Rate { index, helpful })
        }
        ("rate", _) => Err(CommandError::Usage(RATE_USAGE)),
        _ => Err(CommandError::Unknown(line.to_string())),
    }
}

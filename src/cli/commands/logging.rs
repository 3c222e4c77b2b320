use clap::{Arg, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("PASSWORDLESS_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_names_and_numbers() {
        let parser = validator_log_level();
        let command = Command::new("t").arg(Arg::new("level").value_parser(parser));
        for (input, expected) in [("0", 0u8), ("5", 5), ("warn", 1), ("DEBUG", 3), ("trace", 4)] {
            let matches = command.clone().try_get_matches_from(["t", input]);
            assert_eq!(
                matches.ok().and_then(|m| m.get_one::<u8>("level").copied()),
                Some(expected),
                "input {input}"
            );
        }
        assert!(command.clone().try_get_matches_from(["t", "loud"]).is_err());
        assert!(command.try_get_matches_from(["t", "9"]).is_err());
    }

    #[test]
    fn verbosity_counts() {
        let command = with_args(Command::new("t"));
        let matches = command.get_matches_from(["t", "-vvv"]);
        assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(3));
    }
}

//! Interactive credential prompt for the first run.

use std::io::{BufRead, Write};
use u2k_config_and_utils::{is_email_address, is_kindle_address, Config, DEFAULT_SENDER};

/// Attempts allowed for each address.
const MAX_TRIES: usize = 3;

/// Ask for the Kindle address and the sender address.
///
/// The Kindle address is required: running out of tries is an error. The
/// sender is optional: running out of tries falls back to the default.
pub fn prompt_for_credentials<R: BufRead, W: Write, E: Write>(
    input: &mut R,
    output: &mut W,
    errors: &mut E,
) -> anyhow::Result<Config> {
    let email = ask(
        input,
        output,
        errors,
        "Kindle email: ",
        "Invalid Kindle email address",
        is_kindle_address,
    )?;
    let Some(email) = email else {
        anyhow::bail!("Too many tries");
    };

    let from = ask(
        input,
        output,
        errors,
        "Send from: ",
        "Invalid 'from' email address",
        is_email_address,
    )?;
    let from = match from {
        Some(from) => from,
        None => {
            writeln!(output, "Too many tries. Using default: {DEFAULT_SENDER}")?;
            DEFAULT_SENDER.to_string()
        }
    };

    Ok(Config::new(email, Some(from)))
}

fn ask<R: BufRead, W: Write, E: Write>(
    input: &mut R,
    output: &mut W,
    errors: &mut E,
    prompt: &str,
    complaint: &str,
    valid: fn(&str) -> bool,
) -> anyhow::Result<Option<String>> {
    for _ in 0..MAX_TRIES {
        write!(output, "{prompt}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            anyhow::bail!("Input closed");
        }
        let answer = line.trim();
        if valid(answer) {
            return Ok(Some(answer.to_string()));
        }
        writeln!(errors, "{complaint}: {answer}")?;
    }
    Ok(None)
}

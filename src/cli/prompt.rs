//! Interactive prompts for target details missing from the command line.

use std::io::{self, BufRead, Write};

/// Fills in `host` and `port` from `input`, asking on `output` for whichever
/// is missing. Re-asks until the answer is usable.
pub fn resolve_host_port(
    host: Option<String>,
    port: Option<u16>,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<(String, u16)> {
    let host = match host.filter(|h| !h.trim().is_empty()) {
        Some(host) => host,
        None => loop {
            let answer = ask("IP/Host: ", input, output)?;
            if !answer.is_empty() {
                break answer;
            }
            writeln!(output, "Host must not be empty.")?;
        },
    };

    let port = match port {
        Some(port) => port,
        None => loop {
            let answer = ask("Port: ", input, output)?;
            match answer.parse::<u16>() {
                Ok(port) if port > 0 => break port,
                _ => writeln!(output, "Please enter a numeric port.")?,
            }
        },
    };

    Ok((host, port))
}

fn ask(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("no answer for prompt '{}'", question.trim()),
        ));
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_no_prompt_when_complete() {
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        let resolved =
            resolve_host_port(Some("10.0.0.1".to_string()), Some(80), &mut input, &mut output)
                .expect("resolved");
        assert_eq!(resolved, ("10.0.0.1".to_string(), 80));
        assert!(output.is_empty());
    }

    #[test]
    fn test_prompts_and_retries_port() {
        let mut input = Cursor::new(b"\nctf.local\nabc\n0\n8080\n".to_vec());
        let mut output = Vec::new();
        let resolved =
            resolve_host_port(None, None, &mut input, &mut output).expect("resolved");
        assert_eq!(resolved, ("ctf.local".to_string(), 8080));

        let shown = String::from_utf8(output).expect("utf8");
        assert_eq!(shown.matches("IP/Host: ").count(), 2);
        assert_eq!(shown.matches("Please enter a numeric port.").count(), 2);
    }

    #[test]
    fn test_eof_is_an_error() {
        let mut input = Cursor::new(b"host\n".to_vec());
        let mut output = Vec::new();
        let err = resolve_host_port(None, None, &mut input, &mut output).expect_err("eof");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}

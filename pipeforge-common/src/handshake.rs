use std::net::SocketAddr;

use crate::error::Error;

/// First token of the line a plugin prints on stdout once its
/// listener is bound. Anything the plugin writes before it (runtime
/// banners, linker noise) is ignored by the host.
pub const HANDSHAKE_PREFIX: &str = "PIPEFORGE-PLUGIN";

/// Bumped only on incompatible wire changes.
pub const PROTOCOL_VERSION: u32 = 1;

pub fn format_handshake_line(addr: SocketAddr) -> String {
    format!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr)
}

/// Returns `None` for non-handshake lines so callers can keep
/// scanning stdout; a malformed or version-mismatched handshake line
/// is an error.
pub fn parse_handshake_line(line: &str) -> Option<Result<SocketAddr, Error>> {
    // The prefix must be the whole first field; a line merely starting
    // with it is unrelated output.
    let rest = line
        .trim()
        .strip_prefix(HANDSHAKE_PREFIX)?
        .strip_prefix('|')?;

    let mut fields = rest.split('|');
    let (Some(version), Some(addr)) = (fields.next(), fields.next()) else {
        return Some(Err(Error::InvalidInput(format!(
            "malformed plugin handshake line: '{}'",
            line.trim()
        ))));
    };

    match version.parse::<u32>() {
        Ok(v) if v == PROTOCOL_VERSION => {}
        Ok(v) => {
            return Some(Err(Error::InvalidInput(format!(
                "unsupported plugin protocol version {} (host speaks {})",
                v, PROTOCOL_VERSION
            ))));
        }
        Err(_) => {
            return Some(Err(Error::InvalidInput(format!(
                "malformed plugin handshake line: '{}'",
                line.trim()
            ))));
        }
    }

    Some(
        addr.parse::<SocketAddr>()
            .map_err(|e| Error::InvalidInput(format!("bad plugin listen address '{}': {}", addr, e))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let addr: SocketAddr = "127.0.0.1:50051".parse().unwrap();
        let line = format_handshake_line(addr);
        let parsed = parse_handshake_line(&line).expect("not a handshake line");
        assert_eq!(parsed.unwrap(), addr);
    }

    #[test]
    fn unrelated_output_is_skipped() {
        assert!(parse_handshake_line("starting plugin...").is_none());
        assert!(parse_handshake_line("").is_none());
    }

    #[test]
    fn prefix_must_be_exactly_the_first_field() {
        assert!(parse_handshake_line("PIPEFORGE-PLUGINFOO|1|127.0.0.1:1").is_none());
        assert!(parse_handshake_line("PIPEFORGE-PLUGIN ready").is_none());
    }

    #[test]
    fn version_mismatch_is_an_error() {
        let line = format!("{}|99|127.0.0.1:1234", HANDSHAKE_PREFIX);
        let parsed = parse_handshake_line(&line).expect("not a handshake line");
        assert!(matches!(parsed, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let line = format!("{}|one", HANDSHAKE_PREFIX);
        let parsed = parse_handshake_line(&line).expect("not a handshake line");
        assert!(matches!(parsed, Err(Error::InvalidInput(_))));
    }
}

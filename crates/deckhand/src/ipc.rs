//! D-Bus backend for `dbus` actions.

use deckhand_engine::{IpcCall, ServiceError, ServiceResult};
use zbus::blocking::Connection;

/// Split an `interface.Member` method spec at its last dot.
fn split_method(method: &str) -> Option<(&str, &str)> {
    method
        .rsplit_once('.')
        .filter(|(interface, member)| !interface.is_empty() && !member.is_empty())
}

/// Session-bus method caller. A connection is established per call; the
/// engine only invokes this from blocking tasks, never from the event
/// loop.
pub struct DbusCaller;

impl IpcCall for DbusCaller {
    fn call(
        &self,
        destination: &str,
        path: &str,
        method: &str,
        value: Option<&str>,
    ) -> ServiceResult {
        let (interface, member) = split_method(method).ok_or_else(|| {
            ServiceError(format!(
                "'{}' is not an interface-qualified method name",
                method
            ))
        })?;
        let conn = Connection::session().map_err(|e| ServiceError(e.to_string()))?;
        let result = match value {
            Some(v) => conn.call_method(Some(destination), path, Some(interface), member, &(v,)),
            None => conn.call_method(Some(destination), path, Some(interface), member, &()),
        };
        result
            .map(|_| ())
            .map_err(|e| ServiceError(format!("bus call {} on {} failed: {}", method, path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_split_at_the_last_dot() {
        assert_eq!(
            split_method("org.mpris.MediaPlayer2.Player.PlayPause"),
            Some(("org.mpris.MediaPlayer2.Player", "PlayPause"))
        );
        assert_eq!(split_method("PlayPause"), None);
        assert_eq!(split_method("org.example."), None);
        assert_eq!(split_method(".Member"), None);
    }
}

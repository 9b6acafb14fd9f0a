/*!
 * Destination URI parsing: turns a configured destination string into the
 * `(remote, shortname, normalized_path)` triple the worker and transfer
 * invoker need, following the same four-shape grammar rsync itself accepts.
 *
 * Parsing never fails: every non-empty string is a valid destination. A
 * malformed shape (e.g. a daemon form missing its module) degenerates to
 * whatever the syntax leaves behind rather than being rejected, since the
 * string is handed to rsync verbatim and rsync is the one that will
 * complain if it's nonsense.
 */

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// The URI exactly as configured, used in logs and error messages.
    pub raw: String,
    /// Whether this destination is reached over the network (any of the
    /// three remote shapes) as opposed to a local filesystem path.
    pub remote: bool,
    /// Compact, human-readable identifier used in log lines and worker
    /// thread names: the remote host, or the local path's last component.
    pub shortname: String,
    /// The string handed to rsync as its destination operand: `raw` with a
    /// trailing `/` enforced per shape (local paths are also made absolute).
    pub normalized_path: String,
}

impl Destination {
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("rsync://") {
            return Self::parse_rsync_url(raw, rest);
        }

        if let Some(idx) = raw.find("::") {
            let before_slash = match raw.find('/') {
                Some(slash_idx) => idx < slash_idx,
                None => true,
            };
            if before_slash {
                return Self::parse_daemon_shorthand(raw, idx);
            }
        }

        if let Some(colon_idx) = raw.find(':') {
            let colon_before_slash = match raw.find('/') {
                Some(slash_idx) => colon_idx < slash_idx,
                None => true,
            };
            if colon_before_slash {
                return Self::parse_remote_shell(raw, colon_idx);
            }
        }

        Self::parse_local(raw)
    }

    // rsync://[user@]host[:port]/path -> rsync://[user@]host[:port]/path/
    fn parse_rsync_url(raw: &str, rest: &str) -> Self {
        let authority = match rest.find('/') {
            Some(idx) => &rest[..idx],
            None => rest,
        };
        let shortname = shorten(authority);
        let normalized_path = ensure_suffix(raw, true);

        Destination {
            raw: raw.to_string(),
            remote: true,
            shortname,
            normalized_path,
        }
    }

    // [user@]host::module[/path] -> [user@]host::module[/path]/
    fn parse_daemon_shorthand(raw: &str, idx: usize) -> Self {
        let authority = &raw[..idx];
        let shortname = shorten(authority);
        let normalized_path = ensure_suffix(raw, true);

        Destination {
            raw: raw.to_string(),
            remote: true,
            shortname,
            normalized_path,
        }
    }

    // [user@]host:path -> [user@]host:path/, unless it already ends in ':' or '/'
    fn parse_remote_shell(raw: &str, colon_idx: usize) -> Self {
        let authority = &raw[..colon_idx];
        let shortname = shorten(authority);
        let keep_as_is = raw.ends_with(':') || raw.ends_with('/');
        let normalized_path = ensure_suffix(raw, !keep_as_is);

        Destination {
            raw: raw.to_string(),
            remote: true,
            shortname,
            normalized_path,
        }
    }

    // A plain local path -> its absolute form, with a trailing '/' enforced.
    fn parse_local(raw: &str) -> Self {
        let abs = to_absolute(raw);
        let shortname = abs
            .components()
            .next_back()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());

        let mut normalized_path = abs.to_string_lossy().into_owned();
        if !normalized_path.ends_with('/') {
            normalized_path.push('/');
        }

        Destination {
            raw: raw.to_string(),
            remote: false,
            shortname,
            normalized_path,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Strip a `user@` prefix and a `:port`/`:module` suffix from an authority
/// segment, leaving just the bare host.
fn shorten(authority: &str) -> String {
    let host_and_port = match authority.rsplit_once('@') {
        Some((_user, host)) => host,
        None => authority,
    };
    match host_and_port.split_once(':') {
        Some((host, _port)) => host.to_string(),
        None => host_and_port.to_string(),
    }
}

fn ensure_suffix(raw: &str, want_slash: bool) -> String {
    if !want_slash || raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    }
}

fn to_absolute(raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}

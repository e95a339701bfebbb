//! IRC wire format: parse and render `:prefix COMMAND params :trailing`.

/// A parsed IRC protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Source of the message (`nick!user@host` or a server name), if any.
    pub prefix: Option<String>,
    /// Command or numeric reply code.
    pub command: String,
    /// Parameters, trailing parameter last.
    pub params: Vec<String>,
}

impl Message {
    /// Parse one protocol line. Trailing CR/LF is tolerated. Returns `None`
    /// for lines that carry no command.
    pub fn parse(line: &str) -> Option<Message> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut prefix = None;
        if let Some(after) = rest.strip_prefix(':') {
            let (p, tail) = after.split_once(' ')?;
            prefix = Some(p.to_string());
            rest = tail.trim_start();
        }

        let mut params = Vec::new();
        let command = match rest.split_once(' ') {
            Some((cmd, mut tail)) => {
                loop {
                    tail = tail.trim_start();
                    if tail.is_empty() {
                        break;
                    }
                    if let Some(trailing) = tail.strip_prefix(':') {
                        params.push(trailing.to_string());
                        break;
                    }
                    match tail.split_once(' ') {
                        Some((param, next)) => {
                            params.push(param.to_string());
                            tail = next;
                        }
                        None => {
                            params.push(tail.to_string());
                            break;
                        }
                    }
                }
                cmd.to_string()
            }
            None => rest.to_string(),
        };

        if command.is_empty() {
            return None;
        }
        Some(Message {
            prefix,
            command,
            params,
        })
    }

    /// Nick portion of the prefix (`nick!user@host` → `nick`).
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_deref().and_then(|p| p.split('!').next())
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)?;
        for (i, param) in self.params.iter().enumerate() {
            let last = i + 1 == self.params.len();
            if last && (param.is_empty() || param.starts_with(':') || param.contains(' ')) {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

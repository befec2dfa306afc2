//! Pure rendering of log entries for the console and the log file.
//!
//! Both layers in [`subscriber`](super::subscriber) call into this module so
//! that the output of a `(severity, message, settings)` triple can be tested
//! without installing a global subscriber.
use super::types::Severity;

/// Indentation applied to body lines by [`compose_block`].
const BLOCK_INDENT: &str = "  ";

/// Console prefix for `severity` as `(styled, plain)`.
///
/// The plain form determines the visual margin used for continuation lines.
const fn console_prefix(severity: Severity) -> (&'static str, &'static str) {
    match severity {
        Severity::Section => ("\x1b[1;34m==>\x1b[0m ", "==> "),
        Severity::Success => ("  \x1b[32m✓\x1b[0m ", "  ✓ "),
        Severity::Warning => ("\x1b[33mWARN\x1b[0m  ", "WARN  "),
        Severity::Failure => ("\x1b[31mERROR\x1b[0m ", "ERROR "),
        Severity::Sudo => ("  \x1b[35m[SUDO]\x1b[0m ", "  [SUDO] "),
        Severity::DryRun => ("  \x1b[33m[DRY RUN]\x1b[0m ", "  [DRY RUN] "),
        Severity::Log | Severity::Debug => ("  ", "  "),
    }
}

/// Tag written after the timestamp in the log file.
const fn file_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Section => "==> ",
        Severity::Success => "    [ok] ",
        Severity::Warning => "    [warn] ",
        Severity::Failure => "    [error] ",
        Severity::Sudo => "    [sudo] ",
        Severity::DryRun => "    [dry run] ",
        Severity::Debug => "    [debug] ",
        Severity::Log => "    ",
    }
}

/// Remove ANSI escape sequences: CSI sequences up to their final byte and
/// two-byte `ESC x` escapes.
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            chars
                .by_ref()
                .take_while(|c| !('@'..='~').contains(c))
                .for_each(drop);
        }
    }
    out
}

/// Combine `header` and a multi-line `body` into one logical entry.
///
/// Every body line is indented by two spaces below the header; the console
/// and file renderers then align all lines on the entry's margin.
#[must_use]
pub fn compose_block(header: &str, body: &str) -> String {
    let mut out = header.to_string();
    for line in body.lines() {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(BLOCK_INDENT);
            out.push_str(line);
        }
    }
    out
}

/// Render one console entry (without trailing newline).
///
/// With `color` off, ANSI sequences embedded in `msg` are stripped as well.
#[must_use]
pub fn render_console(severity: Severity, msg: &str, color: bool) -> String {
    let text = if color {
        msg.to_string()
    } else {
        strip_ansi(msg)
    };
    let (styled, plain) = console_prefix(severity);
    let margin = " ".repeat(plain.chars().count());

    let style = |line: &str| -> String {
        if !color || line.is_empty() {
            return line.to_string();
        }
        match severity {
            Severity::Section => format!("\x1b[1m{line}\x1b[0m"),
            Severity::Debug => format!("\x1b[2m{line}\x1b[0m"),
            _ => line.to_string(),
        }
    };

    let mut lines = text.split('\n');
    let first = lines.next().unwrap_or_default();
    let mut out = String::with_capacity(text.len() + styled.len());
    out.push_str(if color { styled } else { plain });
    out.push_str(&style(first));
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&margin);
            out.push_str(&style(line));
        }
    }
    out
}

/// Render one log-file entry stamped with `timestamp` (without trailing newline).
#[must_use]
pub fn render_file(severity: Severity, msg: &str, timestamp: &str) -> String {
    let text = strip_ansi(msg);
    let prefix = format!("[{timestamp}] {}", file_tag(severity));
    let margin = " ".repeat(prefix.chars().count());

    let mut lines = text.split('\n');
    let mut out = prefix;
    out.push_str(lines.next().unwrap_or_default());
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&margin);
            out.push_str(line);
        }
    }
    out
}

//! Usage text for a flag set.

use std::fmt::Write;

use crate::flag::Flag;
use crate::value::ValueKind;

/// Pull a back-quoted placeholder name out of the usage text.
///
/// `"a `file` to read"` yields `("file", "a file to read")`. Without back
/// quotes the placeholder comes from the value kind.
pub(crate) fn unquote_usage(flag: &Flag) -> (String, String) {
    let usage = flag.usage();
    if let Some(start) = usage.find('`')
        && let Some(len) = usage[start + 1..].find('`')
    {
        let name = &usage[start + 1..start + 1 + len];
        let text = format!("{}{name}{}", &usage[..start], &usage[start + len + 2..]);
        return (name.to_string(), text);
    }
    (flag.kind().type_name().to_string(), usage.to_string())
}

fn is_zero_default(flag: &Flag) -> bool {
    match flag.kind().zero_text() {
        Some(zero) => flag.default_text() == zero,
        None => flag.default_text().is_empty(),
    }
}

/// One usage entry:
///
/// ```text
///   -name type
///     	usage (default x)
/// ```
pub(crate) fn flag_entry(flag: &Flag) -> String {
    let mut out = format!("  -{}", flag.name());
    let (type_name, usage) = unquote_usage(flag);
    if !type_name.is_empty() {
        out.push(' ');
        out.push_str(&type_name);
    }
    // One-letter boolean flags fit on the same line as their usage.
    if out.len() <= 4 {
        out.push('\t');
    } else {
        out.push_str("\n    \t");
    }
    out.push_str(&usage.replace('\n', "\n    \t"));

    if !is_zero_default(flag) {
        if flag.kind() == ValueKind::String {
            let _ = write!(out, " (default {:?})", flag.default_text());
        } else {
            let _ = write!(out, " (default {})", flag.default_text());
        }
    }

    let annotations = [
        ("env", flag.envs().join(", ")),
        ("config", flag.cfgs().join(", ")),
        ("one of", flag.enums().join("|")),
        (
            "aliases",
            flag.aliases()
                .iter()
                .map(|a| format!("-{a}"))
                .collect::<Vec<_>>()
                .join(", "),
        ),
    ];
    for (label, list) in annotations {
        if !list.is_empty() {
            let _ = write!(out, " ({label}: {list})");
        }
    }

    out.push('\n');
    out
}

/// Every flag's entry, in the order given.
pub(crate) fn defaults<'a>(flags: impl IntoIterator<Item = &'a Flag>) -> String {
    flags.into_iter().map(flag_entry).collect()
}

/// Full usage: header, flag defaults, then sub-commands as
/// `(name, description)` pairs.
pub(crate) fn render<'a>(
    name: &str,
    flags: impl IntoIterator<Item = &'a Flag>,
    sub_commands: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut out = if name.is_empty() {
        "Usage:\n".to_string()
    } else {
        format!("Usage of {name}:\n")
    };
    out.push_str(&defaults(flags));

    let subs: Vec<(&str, &str)> = sub_commands.into_iter().collect();
    if !subs.is_empty() {
        out.push_str("Sub-commands:\n");
        for (sub, description) in subs {
            if description.is_empty() {
                let _ = writeln!(out, "  {sub}");
            } else {
                let _ = writeln!(out, "  {sub}\t{description}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::{Handle, Typed};
    use crate::value::Scalar;
    use std::time::Duration;

    #[test]
    fn back_quoted_name_becomes_placeholder() {
        let h: Typed<String> = Handle::new("config", "a `file` to read", Scalar::new(String::new()));
        let (name, usage) = unquote_usage(h.flag());
        assert_eq!(name, "file");
        assert_eq!(usage, "a file to read");
    }

    #[test]
    fn placeholder_defaults_to_kind() {
        let h: Typed<Duration> = Handle::new("timeout", "wait", Scalar::new(Duration::ZERO));
        assert_eq!(unquote_usage(h.flag()).0, "duration");
    }

    #[test]
    fn short_bool_fits_on_one_line() {
        let h: Typed<bool> = Handle::new("v", "verbose", Scalar::new(false));
        assert_eq!(flag_entry(h.flag()), "  -v\tverbose\n");
    }

    #[test]
    fn long_entry_breaks_line_and_shows_default() {
        let h: Typed<String> = Handle::new("name", "who to greet", Scalar::new("world".to_string()));
        assert_eq!(
            flag_entry(h.flag()),
            "  -name string\n    \twho to greet (default \"world\")\n"
        );
    }

    #[test]
    fn zero_defaults_are_hidden() {
        let h: Typed<i64> = Handle::new("count", "how many", Scalar::new(0));
        assert!(!flag_entry(h.flag()).contains("default"));
        let h: Typed<Duration> = Handle::new("wait", "pause", Scalar::new(Duration::from_secs(5)));
        assert!(flag_entry(h.flag()).contains("(default 5s)"));
    }

    #[test]
    fn bindings_are_annotated() {
        let h: Typed<String> = Handle::new("password", "db password", Scalar::new(String::new()));
        h.flag().bindings_mut().envs.insert("PASSWORD".into());
        h.flag().bindings_mut().cfgs.insert("database.password".into());
        h.flag().link_alias("p");
        let entry = flag_entry(h.flag());
        assert!(entry.contains("(env: PASSWORD)"));
        assert!(entry.contains("(config: database.password)"));
        assert!(entry.contains("(aliases: -p)"));
    }

    #[test]
    fn render_lists_sub_commands() {
        let h: Typed<bool> = Handle::new("verbose", "chatty", Scalar::new(false));
        let subs = [("commit", "record changes"), ("remote", "")];
        let text = render("git", [h.flag()], subs);
        assert!(text.starts_with("Usage of git:\n  -verbose\n"));
        assert!(text.ends_with("Sub-commands:\n  commit\trecord changes\n  remote\n"));
    }
}

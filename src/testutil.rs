use std::sync::Arc;

use crate::config::LgrConfig;
use crate::cp::parse_cp;
use crate::lgr::{AddOptions, EntryInput, Lgr, VariantInput};
use crate::unicode::TableDatabase;

/// One fixture line, already split at `>`.
struct FixtureLine {
    source: Vec<u32>,
    target: Option<Vec<u32>>,
    var_type: Option<String>,
    when: Option<String>,
    not_when: Option<String>,
}

/// Consume a `when=` or `not-when=` token.
fn attributes(token: &str, parsed: &mut FixtureLine) -> bool {
    if let Some(rule) = token.strip_prefix("when=") {
        parsed.when = Some(rule.to_string());
    } else if let Some(rule) = token.strip_prefix("not-when=") {
        parsed.not_when = Some(rule.to_string());
    } else {
        return false;
    }
    true
}

fn parse_line(line: &str) -> FixtureLine {
    let (lhs, rhs) = match line.split_once('>') {
        Some((lhs, rhs)) => (lhs, Some(rhs)),
        None => (line, None),
    };
    let mut parsed = FixtureLine {
        source: Vec::new(),
        target: None,
        var_type: None,
        when: None,
        not_when: None,
    };
    for token in lhs.split_whitespace() {
        if !attributes(token, &mut parsed) {
            parsed.source.push(parse_cp(token).unwrap());
        }
    }
    if let Some(rhs) = rhs {
        let mut target = Vec::new();
        for token in rhs.split_whitespace() {
            if attributes(token, &mut parsed) {
                continue;
            }
            match parse_cp(token) {
                Ok(cp) if parsed.var_type.is_none() => target.push(cp),
                _ => parsed.var_type = Some(token.to_string()),
            }
        }
        parsed.target = Some(target);
    }
    parsed
}

/// Build an LGR from a line based fixture over the default table database.
///
/// Each non-blank line that is not a `#` comment declares an entry, and
/// optionally a variant of it:
///
/// ```text
/// 0061 0062                 # sequence
/// 00B7 when=after-a         # entry context
/// 0061 > 0062 blocked       # variant; the entry is created if missing
/// 0062 > 0061 not-when=r    # variant context
/// ```
///
/// Variant targets are not added to the repertoire.
pub fn lgr_from_fixture(text: &str) -> Lgr {
    lgr_from_fixture_with(text, LgrConfig::default())
}

pub fn lgr_from_fixture_with(text: &str, config: LgrConfig) -> Lgr {
    let mut lgr = Lgr::with_config(Arc::new(TableDatabase::new()), config);
    let opts = AddOptions::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = parse_line(line);
        match line.target {
            Some(target) => {
                if !lgr.repertoire().contains(&line.source) {
                    lgr.add_cp(EntryInput::new(&line.source), &opts).unwrap();
                }
                let mut variant = VariantInput::new(&target, line.var_type.as_deref());
                variant.when = line.when;
                variant.not_when = line.not_when;
                lgr.add_variant(&line.source, variant, &opts).unwrap();
            }
            None => {
                let mut entry = EntryInput::new(&line.source);
                entry.when = line.when;
                entry.not_when = line.not_when;
                lgr.add_cp(entry, &opts).unwrap();
            }
        }
    }
    lgr
}

#[test]
fn fixture_lines() {
    let lgr = lgr_from_fixture(
        "
        # comment
        0061 0062
        0061 > 0062 blocked not-when=r
        ",
    );
    assert_eq!(lgr.repertoire().len(), 2);
    let variants = lgr.repertoire().get_variants(&[0x61]).unwrap();
    assert_eq!(variants[0].cp, vec![0x62]);
    assert_eq!(variants[0].var_type.as_deref(), Some("blocked"));
    assert_eq!(variants[0].context.not_when(), Some("r"));
    assert!(!lgr.repertoire().contains(&[0x62]));
}

use std::sync::LazyLock;

use regex::Regex;

static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

/// Turn raw index-cell text into canonical mnemonics.
///
/// Only the first whitespace-delimited token is considered. Rules, first match wins:
/// - `GETSEC[CAPABILITIES]` → the bracket content alone (`CAPABILITIES`)
/// - `VMLAUNCH/VMRESUME` → one mnemonic per `/` part
/// - `A:B` → one mnemonic per `:` part
/// - otherwise the token itself
///
/// Parts that are not alphanumeric/underscore are dropped. Output is uppercase.
pub fn normalize(raw: &str) -> Vec<String> {
    let Some(token) = raw.split_whitespace().next() else {
        return Vec::new();
    };

    if token.contains('[') && token.contains(']') {
        return BRACKET_RE
            .captures(token)
            .map(|c| c[1].to_string())
            .filter(|inner| is_mnemonic(inner))
            .map(|inner| vec![inner.to_uppercase()])
            .unwrap_or_default();
    }

    if token.contains('/') {
        return split_parts(token, '/');
    }

    if token.contains(':') {
        return split_parts(token, ':');
    }

    if is_mnemonic(token) {
        vec![token.to_uppercase()]
    } else {
        Vec::new()
    }
}

fn split_parts(token: &str, sep: char) -> Vec<String> {
    token
        .split(sep)
        .map(str::trim)
        .filter(|p| is_mnemonic(p))
        .map(str::to_uppercase)
        .collect()
}

/// Alphanumerics and underscores only, with at least one alphanumeric.
pub fn is_mnemonic(s: &str) -> bool {
    s.chars().all(|c| c.is_alphanumeric() || c == '_') && s.chars().any(char::is_alphanumeric)
}

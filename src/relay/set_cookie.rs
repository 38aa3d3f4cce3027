//! `Set-Cookie` parsing for relayed backend responses.
//!
//! Some clients and proxies fold several `Set-Cookie` lines into one
//! comma-joined value. Commas also appear inside single directives
//! (`Expires=Wed, 21 Oct 2015 07:28:00 GMT`, or a value such as `a,b`), so a
//! comma only separates directives when the text after it starts a new
//! `name=value` pair: a cookie-name token followed by `=` before any `;`.
//!
//! Bare commas are not legal in a cookie value, so a folded header is
//! inherently ambiguous when a value holds one. A value such as `YWJj,ZA==`
//! is read as two directives (`YWJj` ends the first), because `ZA=` looks
//! like a new pair. Backends that need commas must quote or encode them.

/// Split a (possibly folded) `Set-Cookie` value into single directives.
pub fn split_set_cookie(header: &str) -> Vec<&str> {
    let mut directives = Vec::new();
    let mut start = 0;

    for (idx, ch) in header.char_indices() {
        if ch != ',' {
            continue;
        }
        let rest = header.get(idx + 1..).unwrap_or_default();
        if starts_cookie_pair(rest) {
            push_directive(&mut directives, header.get(start..idx));
            start = idx + 1;
        }
    }
    push_directive(&mut directives, header.get(start..));

    directives
}

fn push_directive<'a>(directives: &mut Vec<&'a str>, directive: Option<&'a str>) {
    if let Some(directive) = directive.map(str::trim)
        && !directive.is_empty()
    {
        directives.push(directive);
    }
}

fn starts_cookie_pair(rest: &str) -> bool {
    let rest = rest.trim_start();
    let Some(end) = rest.find(['=', ';', ',']) else {
        return false;
    };
    if !rest.get(end..).is_some_and(|tail| tail.starts_with('=')) {
        return false;
    }
    let name = rest.get(..end).unwrap_or_default().trim_end();
    !name.is_empty() && name.bytes().all(is_token_byte)
}

/// RFC 7230 `tchar`.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Value of the first cookie called `name` across all header values.
///
/// The value is returned byte-exact up to the first `;`. Empty values are
/// treated as absent.
pub fn find_cookie<'a, I>(header_values: I, name: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    header_values
        .into_iter()
        .flat_map(split_set_cookie)
        .find_map(|directive| {
            let value = directive.strip_prefix(name)?.strip_prefix('=')?;
            let value = value.split(';').next().unwrap_or_default();
            (!value.is_empty()).then_some(value)
        })
}

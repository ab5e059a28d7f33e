//! HTML escaping for the fallback display.

use std::borrow::Cow;

/// Escapes `&`, `<`, `>`, `"` and `'` as HTML entities.
///
/// Input without any of those characters is returned borrowed.
///
/// ```
/// use faultline::html::escape;
///
/// assert_eq!(escape("a < b && it's \"x\""), "a &lt; b &amp;&amp; it&#039;s &quot;x&quot;");
/// assert!(matches!(escape("plain"), std::borrow::Cow::Borrowed("plain")));
/// ```
#[must_use]
pub fn escape(text: &str) -> Cow<'_, str> {
    let Some(first) = text.find(['&', '<', '>', '"', '\'']) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(&text[..first]);
    // Flush unescaped runs in one go; every special character is ASCII so
    // byte offsets stay on char boundaries.
    let mut copy_start = first;
    for (i, byte) in text.bytes().enumerate().skip(first) {
        let entity = match byte {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#039;",
            _ => continue,
        };
        out.push_str(&text[copy_start..i]);
        out.push_str(entity);
        copy_start = i + 1;
    }
    out.push_str(&text[copy_start..]);
    Cow::Owned(out)
}

/// Wraps escaped text in a `<pre>` block.
#[must_use]
pub fn preformatted(text: &str) -> String {
    format!("<pre>{}</pre>", escape(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(escape("&<>\"'"), "&amp;&lt;&gt;&quot;&#039;");
    }

    #[test]
    fn test_escape_keeps_multibyte_text() {
        assert_eq!(escape("π < σ — ok"), "π &lt; σ — ok");
        assert_eq!(escape("日本"), "日本");
    }

    #[test]
    fn test_escape_does_not_double_decode() {
        assert_eq!(escape("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_preformatted() {
        assert_eq!(
            preformatted("Warning[2]: '<b>' in x on line 1"),
            "<pre>Warning[2]: &#039;&lt;b&gt;&#039; in x on line 1</pre>"
        );
    }
}

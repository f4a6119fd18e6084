/// Mask used by [`obscure_default`].
pub const DEFAULT_SYMBOL: char = '*';

/// Obscure `text`, keeping only the leading and trailing `num` characters and
/// replacing everything between them with `symbol`.
///
/// Text of `2 * num` characters or fewer is too short to obscure and is
/// returned unchanged. Characters are Unicode scalar values, not bytes.
///
/// ```
/// use bmcprobe_core::obscure::obscure;
///
/// assert_eq!(obscure("swordfish", 2, '+'), "sw+++++sh");
/// ```
pub fn obscure(text: &str, num: usize, symbol: char) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= num.saturating_mul(2) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    out.extend(&chars[..num]);
    out.extend(std::iter::repeat(symbol).take(len - 2 * num));
    out.extend(&chars[len - num..]);
    out
}

/// Obscure `text` keeping one character at each end.
pub fn obscure_default(text: &str) -> String {
    obscure(text, 1, DEFAULT_SYMBOL)
}

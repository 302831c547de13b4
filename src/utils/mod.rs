pub mod csv_handler;
pub mod email;
pub mod links;
pub mod money;

use base64::Engine;
use rand::RngExt;

/// 卖家编号字符集（去掉易混淆的 0/O/1/I）
const SELLER_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    iter::repeat_with(|| {
        SELLER_CODE_CHARS[rand::random_range(0..SELLER_CODE_CHARS.len())] as char
    })
    .take(length)
    .collect()
}

/// 生成 magic link code
///
/// `bytes` 个随机字节，base64url 无填充编码。24 字节得到 32 个字符。
pub fn generate_magic_code(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill(buf.as_mut_slice());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// 去掉首尾空白，空串视为缺省
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

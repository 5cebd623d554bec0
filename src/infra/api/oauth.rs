//! OAuth 1.0a (HMAC-SHA1) リクエスト署名
//!
//! Xのv1.1 APIはユーザーコンテキストの書き込み操作にOAuth 1.0aを要求する。
//! ここでは `Authorization` ヘッダーの値を組み立てるところまでを扱い、
//! 実際の送信は `x.rs` のクライアントが行う。

use crate::domain::credentials::Credentials;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// 署名に使う一回限りの値
#[derive(Debug, Clone)]
pub struct OAuthNonce {
    pub nonce: String,
    pub timestamp: i64,
}

/// RFC 3986の非予約文字以外をパーセントエンコードする
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// 署名ベース文字列を作成する
///
/// `METHOD&encode(url)&encode(sorted params)` の形式。
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    )
}

/// HMAC-SHA1で署名しBase64文字列を返す
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).context("署名キーの作成に失敗")?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `Authorization` ヘッダーの値を作成する
///
/// # 引数
/// - `method`: HTTPメソッド
/// - `url`: クエリ文字列を含まないリクエストURL
/// - `request_params`: クエリ・フォームのパラメータ（署名対象）
/// - `credentials`: APIキー一式
/// - `nonce`: nonceとタイムスタンプ
pub fn authorization_header(
    method: &str,
    url: &str,
    request_params: &[(&str, &str)],
    credentials: &Credentials,
    nonce: &OAuthNonce,
) -> Result<String> {
    let timestamp = nonce.timestamp.to_string();
    let oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), credentials.consumer_key.clone()),
        ("oauth_nonce".into(), nonce.nonce.clone()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp),
        ("oauth_token".into(), credentials.access_token.clone()),
        ("oauth_version".into(), "1.0".into()),
    ];

    let mut all_params = oauth_params.clone();
    all_params.extend(
        request_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );

    let base = signature_base_string(method, url, &all_params);
    let signature = sign(
        &base,
        &credentials.consumer_secret,
        &credentials.access_token_secret,
    )?;

    let mut header_params = oauth_params;
    header_params.push(("oauth_signature".into(), signature));
    header_params.sort();

    let fields = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", fields))
}

use actix_web::{
    Error, HttpMessage,
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::{
        Uri,
        header::{CONTENT_LENGTH, HeaderValue},
    },
    middleware::Next,
    web::Bytes,
};
use serde_json::Value;

/// Rewrites `key` so it can't be read as a query operator or a nested path.
///
/// A `$` opening the key, or opening a bracketed segment such as
/// `campground[$gt]`, becomes `_`, as does every `.`. Returns `None` when the
/// key is already clean.
pub fn sanitize_key(key: &str) -> Option<String> {
    let mut changed = false;
    let mut previous = None;
    let clean = key
        .chars()
        .map(|c| {
            let replace = c == '.' || (c == '$' && matches!(previous, None | Some('[')));
            previous = Some(c);
            if replace {
                changed = true;
                '_'
            } else {
                c
            }
        })
        .collect();

    changed.then_some(clean)
}

/// Sanitizes every key of an `application/x-www-form-urlencoded` string.
///
/// Values are left byte-for-byte untouched. Returns `None` when nothing changed.
pub fn sanitize_urlencoded(input: &str) -> Option<String> {
    let mut changed = false;
    let pairs: Vec<String> = input
        .split('&')
        .map(|pair| {
            let (raw_key, value) = match pair.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (pair, None),
            };
            let spaced = raw_key.replace('+', " ");
            let Ok(key) = urlencoding::decode(&spaced) else {
                return pair.to_string();
            };
            let Some(clean) = sanitize_key(&key) else {
                return pair.to_string();
            };

            changed = true;
            let clean = urlencoding::encode(&clean);
            match value {
                Some(value) => format!("{}={}", clean, value),
                None => clean.into_owned(),
            }
        })
        .collect();

    changed.then(|| pairs.join("&"))
}

/// Sanitizes every object key in `value`, recursively. Returns whether anything changed.
pub fn sanitize_json(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let mut changed = false;
            for (key, mut nested) in std::mem::take(map) {
                changed |= sanitize_json(&mut nested);
                let key = match sanitize_key(&key) {
                    Some(clean) => {
                        changed = true;
                        clean
                    }
                    None => key,
                };
                map.insert(key, nested);
            }
            changed
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| sanitize_json(item) | changed),
        _ => false,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Form,
    Json,
}

/// Classifies the body by media type, accepting everything the `Form` and
/// `Json` extractors accept: any letter case, and any `+json` suffix.
fn body_kind(content_type: &str) -> Option<BodyKind> {
    let essence = content_type.trim().to_ascii_lowercase();
    if essence == "application/x-www-form-urlencoded" {
        return Some(BodyKind::Form);
    }

    let (_, subtype) = essence.split_once('/')?;
    (subtype == "json" || subtype.ends_with("+json")).then_some(BodyKind::Json)
}

fn sanitize_body(kind: BodyKind, body: &Bytes) -> Option<Bytes> {
    match kind {
        BodyKind::Form => {
            let text = std::str::from_utf8(body).ok()?;
            sanitize_urlencoded(text).map(Bytes::from)
        }
        BodyKind::Json => {
            let mut value: Value = serde_json::from_slice(body).ok()?;
            if !sanitize_json(&mut value) {
                return None;
            }
            serde_json::to_vec(&value).ok().map(Bytes::from)
        }
    }
}

fn sanitize_query(req: &mut ServiceRequest) {
    let Some(query) = req.uri().query() else {
        return;
    };
    let Some(clean) = sanitize_urlencoded(query) else {
        return;
    };

    match format!("{}?{}", req.path(), clean).parse::<Uri>() {
        Ok(uri) => {
            log::warn!("🧹 Sanitized query keys on {}", req.path());
            req.match_info_mut().get_mut().update(&uri);
            req.head_mut().uri = uri;
        }
        Err(e) => log::warn!("Could not rebuild sanitized query: {}", e),
    }
}

/// First pipeline stage: strips operator-looking keys from the query string
/// and from form or JSON bodies before anything else reads them.
pub async fn sanitize<B: MessageBody>(
    mut req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    sanitize_query(&mut req);

    if let Some(kind) = body_kind(req.content_type()) {
        let body = match req.extract::<Bytes>().await {
            Ok(body) => body,
            Err(e) => return Ok(req.error_response(e).map_into_right_body()),
        };

        let body = match sanitize_body(kind, &body) {
            Some(clean) => {
                log::warn!("🧹 Sanitized body keys on {}", req.path());
                req.headers_mut()
                    .insert(CONTENT_LENGTH, HeaderValue::from(clean.len()));
                clean
            }
            None => body,
        };
        req.set_payload(Payload::from(body));
    }

    next.call(req)
        .await
        .map(ServiceResponse::map_into_left_body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("title"), None);
        assert_eq!(sanitize_key("$where").as_deref(), Some("_where"));
        assert_eq!(sanitize_key("user.name").as_deref(), Some("user_name"));
        assert_eq!(sanitize_key("a.b.c").as_deref(), Some("a_b_c"));
        assert_eq!(
            sanitize_key("campground[$gt]").as_deref(),
            Some("campground[_gt]")
        );
        assert_eq!(sanitize_key("price$"), None);
    }

    #[test]
    fn test_body_kind_follows_extractors() {
        let form = Some(BodyKind::Form);
        let json = Some(BodyKind::Json);

        assert_eq!(body_kind("application/x-www-form-urlencoded"), form);
        assert_eq!(body_kind("Application/X-WWW-Form-Urlencoded"), form);
        assert_eq!(body_kind("application/json"), json);
        assert_eq!(body_kind("APPLICATION/JSON"), json);
        assert_eq!(body_kind("application/merge-patch+json"), json);
        assert_eq!(body_kind("application/vnd.api+json"), json);
        assert_eq!(body_kind("text/plain"), None);
        assert_eq!(body_kind("multipart/form-data"), None);
        assert_eq!(body_kind(""), None);
    }

    #[test]
    fn test_sanitize_urlencoded() {
        assert_eq!(sanitize_urlencoded("title=Camp&price=10"), None);
        assert_eq!(
            sanitize_urlencoded("%24where=1&title=a.b").as_deref(),
            Some("_where=1&title=a.b")
        );
        assert_eq!(
            sanitize_urlencoded("user.name=colt&flag").as_deref(),
            Some("user_name=colt&flag")
        );
    }

    #[test]
    fn test_sanitize_json_nested() {
        let mut value = json!({
            "campground": { "$gt": "", "title": "ok" },
            "tags": [{ "a.b": 1 }],
            "plain": "$value.stays"
        });

        assert!(sanitize_json(&mut value));
        assert_eq!(
            value,
            json!({
                "campground": { "_gt": "", "title": "ok" },
                "tags": [{ "a_b": 1 }],
                "plain": "$value.stays"
            })
        );

        let mut clean = json!({ "title": "Camp" });
        assert!(!sanitize_json(&mut clean));
    }
}

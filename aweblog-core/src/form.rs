use serde_json::{Map, Value};

/// Parse urlencoded `key=value` pairs into a flat JSON object.
/// First value wins for repeated keys.
pub fn parse_urlencoded(input: &[u8]) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in form_urlencoded::parse(input) {
        out.entry(key.into_owned())
            .or_insert_with(|| Value::String(value.into_owned()));
    }
    out
}

/// Parse a query string into a flat JSON object, first value wins.
pub fn parse_query(query: &str) -> Map<String, Value> {
    parse_urlencoded(query.as_bytes())
}

/// Extract the text fields of a `multipart/form-data` body.
///
/// Parts carrying a `filename` are file uploads and are skipped; the
/// argument mapping only holds JSON values.
pub fn parse_multipart(content_type: &str, body: &[u8]) -> Result<Map<String, Value>, String> {
    let boundary = content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
        .ok_or_else(|| "multipart body without a boundary".to_string())?;
    let text = std::str::from_utf8(body)
        .map_err(|_| "multipart body is not valid utf-8".to_string())?;

    let delimiter = format!("--{boundary}");
    let mut out = Map::new();
    for part in text.split(delimiter.as_str()).skip(1) {
        if part.starts_with("--") {
            // closing delimiter
            break;
        }
        let part = part.strip_prefix("\r\n").unwrap_or(part);
        let Some((head, value)) = part.split_once("\r\n\r\n") else {
            continue;
        };
        let Some(name) = field_name(head) else {
            continue;
        };
        let value = value.strip_suffix("\r\n").unwrap_or(value);
        out.entry(name)
            .or_insert_with(|| Value::String(value.to_string()));
    }
    Ok(out)
}

/// `name` from the part's `Content-Disposition` header, unless the part is
/// a file upload.
fn field_name(head: &str) -> Option<String> {
    for line in head.lines() {
        if !line.to_ascii_lowercase().starts_with("content-disposition:") {
            continue;
        }
        let mut name = None;
        for item in line.split(';').map(str::trim) {
            if item.to_ascii_lowercase().starts_with("filename=") {
                return None;
            }
            if let Some(value) = item.strip_prefix("name=") {
                name = Some(value.trim_matches('"').to_string());
            }
        }
        return name;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urlencoded_first_value_wins() {
        let map = parse_urlencoded(b"a=1&b=2&a=3");
        assert_eq!(map.get("a"), Some(&json!("1")));
        assert_eq!(map.get("b"), Some(&json!("2")));
    }

    #[test]
    fn query_decodes_percent_escapes() {
        let map = parse_query("email=a%40b.com&name=Alice+Smith");
        assert_eq!(map.get("email"), Some(&json!("a@b.com")));
        assert_eq!(map.get("name"), Some(&json!("Alice Smith")));
    }

    #[test]
    fn multipart_text_fields() {
        let body = concat!(
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"email\"\r\n",
            "\r\n",
            "a@b.com\r\n",
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n",
            "Content-Type: image/png\r\n",
            "\r\n",
            "PNGDATA\r\n",
            "--xyz--\r\n",
        );
        let map = parse_multipart("multipart/form-data; boundary=xyz", body.as_bytes()).unwrap();
        assert_eq!(map.get("email"), Some(&json!("a@b.com")));
        // file parts are skipped
        assert!(map.get("avatar").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn multipart_without_boundary_is_an_error() {
        assert!(parse_multipart("multipart/form-data", b"").is_err());
    }
}

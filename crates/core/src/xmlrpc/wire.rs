//! XML-RPC wire codec: `<methodCall>` serialization and `<methodResponse>`
//! parsing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{TransportError, Value};

/// Serialize a method call document.
pub fn build_request(method: &str, params: &[Value]) -> String {
    let mut body = String::with_capacity(256);
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    body.push_str("<methodCall><methodName>");
    body.push_str(&escape(method));
    body.push_str("</methodName><params>");
    for param in params {
        body.push_str("<param>");
        write_value(param, &mut body);
        body.push_str("</param>");
    }
    body.push_str("</params></methodCall>");
    body
}

fn write_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push_str(if *b { "1" } else { "0" });
            out.push_str("</boolean>");
        }
        Value::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&BASE64.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(map) => {
            out.push_str("<struct>");
            for (name, member) in map {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Parse a method response document into its payload value.
///
/// A `<fault>` response becomes [`TransportError::Fault`]; anything that is
/// not a well-formed response becomes [`TransportError::Malformed`].
pub fn parse_response(xml: &str) -> Result<Value, TransportError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_fault = false;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => match e.name().as_ref() {
                b"methodResponse" | b"params" | b"param" => {}
                b"fault" => in_fault = true,
                b"value" => {
                    let value = parse_value(&mut reader)?;
                    return if in_fault {
                        Err(fault_error(value))
                    } else {
                        Ok(value)
                    };
                }
                other => {
                    return Err(TransportError::Malformed(format!(
                        "unexpected element <{}>",
                        String::from_utf8_lossy(other)
                    )))
                }
            },
            Event::Eof => {
                return Err(TransportError::Malformed(
                    "response contains no value".to_string(),
                ))
            }
            _ => {}
        }
    }
}

/// Parse the contents of a `<value>` element whose start tag has been
/// consumed, through its end tag.
fn parse_value(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut text: Option<String> = None;
    let mut typed: Option<Value> = None;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Text(t) => {
                text = Some(t.unescape().map_err(malformed)?.into_owned());
            }
            Event::Start(e) => {
                let tag = e.name().as_ref().to_vec();
                typed = Some(parse_typed(reader, &tag)?);
            }
            Event::Empty(e) => {
                typed = Some(match e.name().as_ref() {
                    b"nil" => Value::Nil,
                    b"string" => Value::String(String::new()),
                    other => {
                        return Err(TransportError::Malformed(format!(
                            "unexpected empty element <{}/> in value",
                            String::from_utf8_lossy(other)
                        )))
                    }
                });
            }
            Event::End(e) if e.name().as_ref() == b"value" => {
                // Untyped <value>text</value> content defaults to string.
                return Ok(typed.unwrap_or_else(|| Value::String(text.unwrap_or_default())));
            }
            Event::Eof => return Err(unterminated("value")),
            _ => {}
        }
    }
}

fn parse_typed(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<Value, TransportError> {
    match tag {
        b"string" => Ok(Value::String(read_text(reader, b"string")?)),
        b"int" | b"i4" | b"i8" => {
            let text = read_text(reader, tag)?;
            text.trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| TransportError::Malformed(format!("invalid integer {text:?}")))
        }
        b"boolean" => {
            let text = read_text(reader, b"boolean")?;
            match text.trim() {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                other => Err(TransportError::Malformed(format!(
                    "invalid boolean {other:?}"
                ))),
            }
        }
        b"double" => {
            let text = read_text(reader, b"double")?;
            text.trim()
                .parse()
                .map(Value::Double)
                .map_err(|_| TransportError::Malformed(format!("invalid double {text:?}")))
        }
        b"base64" => {
            let text = read_text(reader, b"base64")?;
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64
                .decode(compact)
                .map(Value::Base64)
                .map_err(|e| TransportError::Malformed(format!("invalid base64: {e}")))
        }
        // OSDb barely uses dates; carry them as opaque strings.
        b"dateTime.iso8601" => Ok(Value::String(read_text(reader, tag)?)),
        b"nil" => {
            read_text(reader, b"nil")?;
            Ok(Value::Nil)
        }
        b"struct" => parse_struct(reader),
        b"array" => parse_array(reader),
        other => Err(TransportError::Malformed(format!(
            "unknown value type <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Collect character data up to the named end tag.
fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, TransportError> {
    let mut out = String::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Text(t) => out.push_str(&t.unescape().map_err(malformed)?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if e.name().as_ref() == end => return Ok(out),
            Event::Eof => return Err(unterminated(&String::from_utf8_lossy(end))),
            _ => {
                return Err(TransportError::Malformed(format!(
                    "unexpected markup inside <{}>",
                    String::from_utf8_lossy(end)
                )))
            }
        }
    }
}

fn parse_struct(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut map = std::collections::BTreeMap::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) if e.name().as_ref() == b"member" => {
                let (name, value) = parse_member(reader)?;
                map.insert(name, value);
            }
            Event::End(e) if e.name().as_ref() == b"struct" => return Ok(Value::Struct(map)),
            Event::Eof => return Err(unterminated("struct")),
            _ => {}
        }
    }
}

fn parse_member(reader: &mut Reader<&[u8]>) -> Result<(String, Value), TransportError> {
    let mut name: Option<String> = None;
    let mut value: Option<Value> = None;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) if e.name().as_ref() == b"name" => {
                name = Some(read_text(reader, b"name")?);
            }
            Event::Start(e) if e.name().as_ref() == b"value" => {
                value = Some(parse_value(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"member" => {
                return match (name, value) {
                    (Some(name), Some(value)) => Ok((name, value)),
                    _ => Err(TransportError::Malformed(
                        "struct member missing name or value".to_string(),
                    )),
                };
            }
            Event::Eof => return Err(unterminated("member")),
            _ => {}
        }
    }
}

fn parse_array(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut items = Vec::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) if e.name().as_ref() == b"value" => {
                items.push(parse_value(reader)?);
            }
            Event::Start(e) if e.name().as_ref() == b"data" => {}
            Event::Empty(e) if e.name().as_ref() == b"data" => {}
            Event::End(e) if e.name().as_ref() == b"array" => return Ok(Value::Array(items)),
            Event::Eof => return Err(unterminated("array")),
            _ => {}
        }
    }
}

/// Turn a parsed `<fault>` value into the corresponding error.
fn fault_error(value: Value) -> TransportError {
    let (code, message) = match value.as_struct() {
        Some(map) => (
            map.get("faultCode").and_then(Value::as_i64).unwrap_or(0),
            map.get("faultString")
                .and_then(|v| v.scalar_string())
                .unwrap_or_default(),
        ),
        None => (0, String::new()),
    };
    TransportError::Fault { code, message }
}

fn malformed(e: impl std::fmt::Display) -> TransportError {
    TransportError::Malformed(e.to_string())
}

fn unterminated(element: &str) -> TransportError {
    TransportError::Malformed(format!("unterminated <{element}>"))
}

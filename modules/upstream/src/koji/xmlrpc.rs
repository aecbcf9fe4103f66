//! Minimal XML-RPC encoding and decoding, covering the subset of the
//! protocol the build system hub speaks.

use crate::Error;
use std::collections::HashMap;
use xml::reader::{EventReader, XmlEvent};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(HashMap<String, Value>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Nil => out.push_str("<nil/>"),
        Value::Bool(value) => {
            out.push_str("<boolean>");
            out.push(if *value { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        Value::Int(value) => {
            out.push_str("<int>");
            out.push_str(&value.to_string());
            out.push_str("</int>");
        }
        Value::Double(value) => {
            out.push_str("<double>");
            out.push_str(&value.to_string());
            out.push_str("</double>");
        }
        Value::String(value) => {
            out.push_str("<string>");
            out.push_str(&escape(value));
            out.push_str("</string>");
        }
        Value::Array(values) => {
            out.push_str("<array><data>");
            for value in values {
                write_value(out, value);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, value) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name));
                out.push_str("</name>");
                write_value(out, value);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

pub fn write_request(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

struct Parser<'a> {
    reader: EventReader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(body: &'a str) -> Self {
        Self {
            reader: EventReader::new(body.as_bytes()),
        }
    }

    fn next(&mut self) -> Result<XmlEvent, Error> {
        loop {
            let event = self
                .reader
                .next()
                .map_err(|err| Error::Payload(err.to_string()))?;
            match event {
                XmlEvent::Whitespace(_)
                | XmlEvent::Comment(_)
                | XmlEvent::ProcessingInstruction { .. }
                | XmlEvent::StartDocument { .. } => continue,
                XmlEvent::Characters(text) if text.trim().is_empty() => continue,
                event => return Ok(event),
            }
        }
    }

    fn expect_start(&mut self, expected: &str) -> Result<(), Error> {
        match self.next()? {
            XmlEvent::StartElement { name, .. } if name.local_name == expected => Ok(()),
            event => Err(Error::Payload(format!(
                "expected <{expected}>, got {event:?}"
            ))),
        }
    }

    fn expect_end(&mut self, expected: &str) -> Result<(), Error> {
        match self.next()? {
            XmlEvent::EndElement { name } if name.local_name == expected => Ok(()),
            event => Err(Error::Payload(format!(
                "expected </{expected}>, got {event:?}"
            ))),
        }
    }

    fn characters(&mut self, element: &str) -> Result<String, Error> {
        match self.next()? {
            XmlEvent::Characters(text) => {
                self.expect_end(element)?;
                Ok(text)
            }
            XmlEvent::EndElement { name } if name.local_name == element => Ok(String::new()),
            event => Err(Error::Payload(format!(
                "expected text in <{element}>, got {event:?}"
            ))),
        }
    }

    /// Parse the content of a `<value>` element whose start tag has already
    /// been consumed.
    fn value(&mut self) -> Result<Value, Error> {
        match self.next()? {
            // untyped values are strings
            XmlEvent::Characters(text) => {
                self.expect_end("value")?;
                Ok(Value::String(text))
            }
            XmlEvent::EndElement { name } if name.local_name == "value" => {
                Ok(Value::String(String::new()))
            }
            XmlEvent::StartElement { name, .. } => {
                let value = match name.local_name.as_str() {
                    "nil" => {
                        self.expect_end("nil")?;
                        Value::Nil
                    }
                    "boolean" => {
                        let text = self.characters("boolean")?;
                        Value::Bool(text.trim() == "1")
                    }
                    "i4" | "i8" | "int" => {
                        let element = name.local_name.clone();
                        let text = self.characters(&element)?;
                        Value::Int(
                            text.trim()
                                .parse()
                                .map_err(|_| Error::Payload(format!("invalid integer: {text}")))?,
                        )
                    }
                    "double" => {
                        let text = self.characters("double")?;
                        Value::Double(
                            text.trim()
                                .parse()
                                .map_err(|_| Error::Payload(format!("invalid double: {text}")))?,
                        )
                    }
                    "string" | "dateTime.iso8601" | "base64" => {
                        let element = name.local_name.clone();
                        Value::String(self.characters(&element)?)
                    }
                    "array" => {
                        self.expect_start("data")?;
                        let mut values = Vec::new();
                        loop {
                            match self.next()? {
                                XmlEvent::StartElement { name, .. }
                                    if name.local_name == "value" =>
                                {
                                    values.push(self.value()?);
                                }
                                XmlEvent::EndElement { name }
                                    if name.local_name == "data" =>
                                {
                                    break;
                                }
                                event => {
                                    return Err(Error::Payload(format!(
                                        "unexpected event in array: {event:?}"
                                    )));
                                }
                            }
                        }
                        self.expect_end("array")?;
                        Value::Array(values)
                    }
                    "struct" => {
                        let mut members = HashMap::new();
                        loop {
                            match self.next()? {
                                XmlEvent::StartElement { name, .. }
                                    if name.local_name == "member" =>
                                {
                                    self.expect_start("name")?;
                                    let key = self.characters("name")?;
                                    self.expect_start("value")?;
                                    let value = self.value()?;
                                    self.expect_end("member")?;
                                    members.insert(key, value);
                                }
                                XmlEvent::EndElement { name }
                                    if name.local_name == "struct" =>
                                {
                                    break;
                                }
                                event => {
                                    return Err(Error::Payload(format!(
                                        "unexpected event in struct: {event:?}"
                                    )));
                                }
                            }
                        }
                        Value::Struct(members)
                    }
                    other => {
                        return Err(Error::Payload(format!("unsupported value type: {other}")));
                    }
                };
                self.expect_end("value")?;
                Ok(value)
            }
            event => Err(Error::Payload(format!(
                "unexpected event in value: {event:?}"
            ))),
        }
    }
}

pub fn parse_response(body: &str) -> Result<Value, Error> {
    let mut parser = Parser::new(body);
    parser.expect_start("methodResponse")?;

    match parser.next()? {
        XmlEvent::StartElement { name, .. } if name.local_name == "params" => {
            parser.expect_start("param")?;
            parser.expect_start("value")?;
            parser.value()
        }
        XmlEvent::StartElement { name, .. } if name.local_name == "fault" => {
            parser.expect_start("value")?;
            let fault = parser.value()?;
            let code = fault.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
            let message = fault
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or("unknown fault")
                .to_string();
            Err(Error::Fault { code, message })
        }
        event => Err(Error::Payload(format!(
            "unexpected method response: {event:?}"
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_round_trips_params() {
        let request = write_request(
            "listTagged",
            &[
                Value::String("dist-rocky8-compose".to_string()),
                Value::Struct(HashMap::from([
                    ("__starstar".to_string(), Value::Bool(true)),
                    ("package".to_string(), Value::String("cmake".to_string())),
                ])),
            ],
        );

        assert!(request.contains("<methodName>listTagged</methodName>"));
        assert!(request.contains("<string>dist-rocky8-compose</string>"));
        assert!(request.contains("<name>package</name>"));
    }

    #[test]
    fn parses_scalar_response() {
        let body = r#"<?xml version="1.0"?>
            <methodResponse>
              <params><param><value><int>5913</int></value></param></params>
            </methodResponse>"#;
        assert_eq!(parse_response(body).unwrap(), Value::Int(5913));
    }

    #[test]
    fn parses_array_of_structs() {
        let body = r#"<?xml version="1.0"?>
            <methodResponse><params><param><value><array><data>
              <value><struct>
                <member><name>build_id</name><value><int>10</int></value></member>
                <member><name>package_name</name><value><string>cmake</string></value></member>
                <member><name>epoch</name><value><nil/></value></member>
              </struct></value>
            </data></array></value></param></params></methodResponse>"#;

        let value = parse_response(body).unwrap();
        let builds = value.as_array().unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].get("build_id").and_then(Value::as_i64), Some(10));
        assert_eq!(builds[0].get("package_name").and_then(Value::as_str), Some("cmake"));
        assert_eq!(builds[0].get("epoch"), Some(&Value::Nil));
    }

    #[test]
    fn parses_untyped_string_value() {
        let body = r#"<methodResponse><params><param><value>plain</value></param></params></methodResponse>"#;
        assert_eq!(
            parse_response(body).unwrap(),
            Value::String("plain".to_string())
        );
    }

    #[test]
    fn surfaces_faults() {
        let body = r#"<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>1000</int></value></member>
            <member><name>faultString</name><value><string>invalid tag</string></value></member>
        </struct></value></fault></methodResponse>"#;

        match parse_response(body) {
            Err(Error::Fault { code, message }) => {
                assert_eq!(code, 1000);
                assert_eq!(message, "invalid tag");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }
}

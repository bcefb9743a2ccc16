//! `application/x-www-form-urlencoded` codec.

use super::{BodyReader, BodyWriter};
use crate::error::Result;
use crate::protocol;
use crate::types::{Entity, EntityKind, Form, Headers, Parameters};
use mime::Mime;
use std::io::{Read, Write};

/// Writes and reads [`Form`] entities as URL-encoded bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl BodyWriter for FormCodec {
    fn is_writeable(&self, kind: EntityKind, media_type: &Mime) -> bool {
        kind == EntityKind::Form && protocol::is_form(media_type)
    }

    fn write_to(
        &self,
        entity: &Entity,
        _media_type: &Mime,
        _headers: &mut Headers,
        sink: &mut dyn Write,
    ) -> Result<()> {
        if let Entity::Form(form) = entity {
            sink.write_all(form.as_parameters().to_query_string().as_bytes())?;
        }
        Ok(())
    }
}

impl BodyReader for FormCodec {
    fn is_readable(&self, kind: EntityKind, media_type: &Mime) -> bool {
        kind == EntityKind::Form && protocol::is_form(media_type)
    }

    fn read_from(
        &self,
        _kind: EntityKind,
        _media_type: &Mime,
        _headers: &Headers,
        source: &mut dyn Read,
    ) -> Result<Entity> {
        let mut body = Vec::new();
        source.read_to_end(&mut body)?;
        let params: Parameters = url::form_urlencoded::parse(&body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Entity::Form(Form::from(params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_encoding_escapes() {
        let mut out = Vec::new();
        let form = Form::new().param("q", "a b&c").param("x", "é");
        FormCodec
            .write_to(
                &Entity::Form(form),
                &mime::APPLICATION_WWW_FORM_URLENCODED,
                &mut Headers::new(),
                &mut out,
            )
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "q=a+b%26c&x=%C3%A9");
    }

    #[test]
    fn test_form_read_keeps_order_and_repeats() {
        let entity = FormCodec
            .read_from(
                EntityKind::Form,
                &mime::APPLICATION_WWW_FORM_URLENCODED,
                &Headers::new(),
                &mut &b"b=bravo&a=alpha&b=again"[..],
            )
            .unwrap();
        let Entity::Form(form) = entity else {
            panic!("expected form");
        };
        let pairs: Vec<(&str, &str)> = form.as_parameters().iter().collect();
        assert_eq!(pairs, vec![("b", "bravo"), ("a", "alpha"), ("b", "again")]);
    }
}

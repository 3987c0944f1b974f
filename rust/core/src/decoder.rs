// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Lazily decode IFC entities from byte offsets. Strings are unescaped on
//! decode, typed values (`IFCREAL(1.5)`) keep their type keyword.

use crate::error::{Error, Result};
use crate::parser::{parse_entity, statement_end, Token};
use crate::schema::IfcType;
use crate::step_string::decode_step_string;
use rustc_hash::FxHashMap;

/// Pre-built entity index type
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content - O(n) scan using SIMD-accelerated search
/// Returns index mapping entity IDs to byte offsets of the DATA section
pub fn build_entity_index(content: &str) -> EntityIndex {
    let bytes = content.as_bytes();
    let len = bytes.len();

    // Pre-allocate with estimated capacity (roughly 1 entity per 50 bytes)
    let mut index = FxHashMap::with_capacity_and_hasher(len / 50, Default::default());

    let mut pos = content.find("DATA;").map(|i| i + 5).unwrap_or(0);

    while pos < len {
        let hash_offset = match memchr::memchr(b'#', &bytes[pos..]) {
            Some(offset) => offset,
            None => break,
        };

        let start = pos + hash_offset;
        pos = start + 1;

        let id_start = pos;
        while pos < len && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let id_end = pos;

        // Handles both `#45=` and `#45 = `
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        if id_end > id_start && pos < len && bytes[pos] == b'=' {
            let id = match content[id_start..id_end].parse::<u32>() {
                Ok(id) => id,
                Err(_) => continue,
            };
            match statement_end(bytes, pos) {
                Some(end) => {
                    index.insert(id, (start, end));
                    pos = end;
                }
                None => break, // unterminated statement
            }
        }
    }

    index
}

/// IFC entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value (unescaped)
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enum value without the dots
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed value such as IFCTEXT('x') -> ("IFCTEXT", String("x"))
    Typed(String, Box<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(decode_step_string(s)),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => {
                AttributeValue::List(items.iter().map(Self::from_token).collect())
            }
            Token::TypedValue(type_name, args) => {
                let inner = match args.as_slice() {
                    [single] => Self::from_token(single),
                    many => AttributeValue::List(many.iter().map(Self::from_token).collect()),
                };
                AttributeValue::Typed(type_name.to_ascii_uppercase(), Box::new(inner))
            }
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as string, looking through typed wrappers like IFCLABEL('x')
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Typed(_, inner) => inner.as_string(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get as float, looking through typed wrappers like IFCREAL(1.5)
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Typed(_, inner) => inner.as_float(),
            _ => None,
        }
    }


    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Type keyword of a typed value
    pub fn type_name(&self) -> Option<&str> {
        match self {
            AttributeValue::Typed(name, _) => Some(name),
            _ => None,
        }
    }

    /// Check if null/derived
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null | AttributeValue::Derived)
    }

    /// Entity ids referenced anywhere inside this value
    pub fn collect_refs(&self, out: &mut Vec<u32>) {
        match self {
            AttributeValue::EntityRef(id) => out.push(*id),
            AttributeValue::List(items) => items.iter().for_each(|item| item.collect_refs(out)),
            AttributeValue::Typed(_, inner) => inner.collect_refs(out),
            _ => {}
        }
    }

    /// Parse a list of numbers, e.g. IfcCartesianPoint coordinates
    pub fn as_float_list(&self) -> Option<Vec<f64>> {
        self.as_list()?.iter().map(|v| v.as_float()).collect()
    }
}

/// Decoded IFC entity with attributes
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub id: u32,
    pub ifc_type: IfcType,
    /// Upper-case keyword as written in the file
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
}

impl DecodedEntity {
    pub fn new(id: u32, type_name: &str, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            ifc_type: IfcType::from_name(type_name),
            type_name: type_name.to_ascii_uppercase(),
            attributes,
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    #[inline]
    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index)?.as_entity_ref()
    }

    #[inline]
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index)?.as_string()
    }

    #[inline]
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index)?.as_float()
    }

    #[inline]
    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index)?.as_list()
    }

    /// Entity ids from a list attribute, ignoring non-references
    pub fn get_ref_list(&self, index: usize) -> Vec<u32> {
        self.get_list(index)
            .map(|items| items.iter().filter_map(|v| v.as_entity_ref()).collect())
            .unwrap_or_default()
    }

    /// Every entity id referenced by this entity
    pub fn references(&self) -> Vec<u32> {
        let mut refs = Vec::new();
        for attr in &self.attributes {
            attr.collect_refs(&mut refs);
        }
        refs
    }
}

/// Lazy entity decoder over one file's content
pub struct EntityDecoder<'a> {
    content: &'a str,
    /// Decoded entities by id
    cache: FxHashMap<u32, DecodedEntity>,
    /// Entity offsets, built on first lookup
    entity_index: Option<EntityIndex>,
}

impl<'a> EntityDecoder<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: None,
        }
    }

    fn build_index(&mut self) -> &EntityIndex {
        let content = self.content;
        self.entity_index
            .get_or_insert_with(|| build_entity_index(content))
    }

    /// All indexed ids in ascending order
    pub fn ids(&mut self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.build_index().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn decode_at(&mut self, start: usize, end: usize) -> Result<DecodedEntity> {
        let line = &self.content[start..end];
        let (id, type_name, tokens) = parse_entity(line).map_err(|e| {
            Error::parse(
                start,
                format!("{}, input: {:?}", e, &line[..line.len().min(100)]),
            )
        })?;

        let attributes = tokens.iter().map(AttributeValue::from_token).collect();
        let entity = DecodedEntity::new(id, type_name, attributes);
        self.cache.insert(id, entity.clone());
        Ok(entity)
    }

    /// Decode entity by id
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<DecodedEntity> {
        if let Some(entity) = self.cache.get(&entity_id) {
            return Ok(entity.clone());
        }

        let (start, end) = self
            .build_index()
            .get(&entity_id)
            .copied()
            .ok_or(Error::EntityNotFound(entity_id))?;

        self.decode_at(start, end)
    }

    /// Decode every entity of the given type, in id order
    pub fn entities_of_type(&mut self, ifc_type: IfcType) -> Result<Vec<DecodedEntity>> {
        let mut found = Vec::new();
        for id in self.ids() {
            let entity = self.decode_by_id(id)?;
            if entity.ifc_type == ifc_type {
                found.push(entity);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4X3_ADD2'));
ENDSEC;
DATA;
#1=IFCCARTESIANPOINT((104481.2,1213210.5,64.8));
#2 = IFCPROPERTYSINGLEVALUE('ImageURL',$,IFCTEXT('https://x.test/a.jpg?x=1;y=#9'),$);
#3=IFCPROPERTYSINGLEVALUE('GPS_Elevation',$,IFCREAL(64.8),$);
#4=IFCPROPERTYSET('0YvctVUKr0kugbFTf53O9L',$,'ImageMetadata',$,(#2,#3));
#5=IFCPERSON($,'Nordmann','Kari',$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_index_ignores_hash_inside_strings() {
        let index = build_entity_index(SAMPLE);
        assert_eq!(index.len(), 5);
        assert!(!index.contains_key(&9));
        let (start, end) = index[&2];
        assert!(SAMPLE[start..end].ends_with("$);"));
    }

    #[test]
    fn test_decode_typed_values() {
        let mut decoder = EntityDecoder::new(SAMPLE);

        let url = decoder.decode_by_id(2).unwrap();
        assert_eq!(url.ifc_type, IfcType::IfcPropertySingleValue);
        assert_eq!(url.get_string(0), Some("ImageURL"));
        assert_eq!(url.get(2).and_then(|v| v.type_name()), Some("IFCTEXT"));
        assert_eq!(url.get_string(2), Some("https://x.test/a.jpg?x=1;y=#9"));

        let elevation = decoder.decode_by_id(3).unwrap();
        assert_eq!(elevation.get_float(2), Some(64.8));
    }

    #[test]
    fn test_decode_and_follow_refs() {
        let mut decoder = EntityDecoder::new(SAMPLE);
        let pset = decoder.decode_by_id(4).unwrap();
        assert_eq!(pset.get_ref_list(4), vec![2, 3]);
        assert_eq!(pset.references(), vec![2, 3]);

        let url = decoder.decode_by_id(pset.get_ref_list(4)[0]).unwrap();
        assert_eq!(url.get_string(0), Some("ImageURL"));

        let point = decoder.decode_by_id(1).unwrap();
        assert_eq!(
            point.get(0).and_then(|v| v.as_float_list()),
            Some(vec![104481.2, 1213210.5, 64.8])
        );
    }

    #[test]
    fn test_missing_entity() {
        let mut decoder = EntityDecoder::new(SAMPLE);
        assert!(matches!(
            decoder.decode_by_id(42),
            Err(Error::EntityNotFound(42))
        ));
        assert_eq!(decoder.ids(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_entities_of_type() {
        let mut decoder = EntityDecoder::new(SAMPLE);
        let values = decoder
            .entities_of_type(IfcType::IfcPropertySingleValue)
            .unwrap();
        assert_eq!(values.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 3]);
    }
}

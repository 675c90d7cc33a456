//! Flat-parameter codec for query-style APIs.
//!
//! Query-string APIs (AWS and friends) cannot carry nested values, so lists and
//! lists of structs are spelled out as dotted, indexed keys:
//!
//! ```text
//! AvailabilityZones.member.1=us-east-1a      list of literals, 1-based
//! Listeners.member.2.InstancePort=80         list of structs, 1-based
//! realiplist.0.ip=10.0.0.1                   list of structs, 0-based
//! ```
//!
//! The numbering/naming variant is a [`ListConvention`]; both variants share one
//! encoder and one decoder.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// One struct inside a list of structs: field name -> scalar value.
pub type ParamStruct = BTreeMap<String, String>;

// ============ Parameter tree ============

/// A node of a [`ParameterTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A single value, passed through under its own name.
    Scalar(String),
    /// An ordered list of literal values.
    Literals(Vec<String>),
    /// An ordered list of structs.
    Structs(Vec<ParamStruct>),
}

/// The kind of node expected under a name when decoding a whole tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Expect a [`ParamValue::Scalar`].
    Scalar,
    /// Expect a [`ParamValue::Literals`].
    Literals,
    /// Expect a [`ParamValue::Structs`].
    Structs,
}

/// The logical request payload before wire encoding.
///
/// Built with the chaining helpers:
///
/// ```rust
/// use cloudwire_provider::ParameterTree;
///
/// let tree = ParameterTree::new()
///     .scalar("Action", "CreateDBInstance")
///     .literals("VpcSecurityGroupIds", ["sg-1", "sg-2"]);
/// assert_eq!(tree.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterTree {
    nodes: BTreeMap<String, ParamValue>,
}

impl ParameterTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scalar node.
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.nodes
            .insert(name.into(), ParamValue::Scalar(value.into()));
        self
    }

    /// Adds a list-of-literals node.
    #[must_use]
    pub fn literals<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.nodes.insert(name.into(), ParamValue::Literals(values));
        self
    }

    /// Adds a list-of-structs node.
    #[must_use]
    pub fn structs<I>(mut self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = ParamStruct>,
    {
        let items = items.into_iter().collect();
        self.nodes.insert(name.into(), ParamValue::Structs(items));
        self
    }

    /// Inserts a node, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.nodes.insert(name.into(), value)
    }

    /// Looks up a node by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.nodes.get(name)
    }

    /// Returns the scalar stored under `name`, if that node is a scalar.
    pub fn get_scalar(&self, name: &str) -> Option<&str> {
        match self.nodes.get(name) {
            Some(ParamValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    /// Moves every node of `other` into `self`; `other` wins on name collisions.
    pub fn merge(&mut self, other: Self) {
        self.nodes.extend(other.nodes);
    }

    /// Iterates nodes in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.nodes.iter()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builds a tree from any serializable value whose top level is an object.
    ///
    /// Strings, numbers and booleans become scalars, arrays of scalars become
    /// literal lists, arrays of flat objects become struct lists. `null` fields are
    /// skipped. Anything deeper is rejected rather than flattened by guesswork.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| serialization_error(e.to_string()))?;
        let serde_json::Value::Object(map) = value else {
            return Err(serialization_error("top-level value must be an object"));
        };

        let mut tree = Self::new();
        for (name, node) in map {
            match node {
                serde_json::Value::Null => {}
                serde_json::Value::Array(items) => {
                    if items.iter().all(serde_json::Value::is_object) && !items.is_empty() {
                        let structs = items
                            .iter()
                            .map(|item| json_struct(&name, item))
                            .collect::<Result<Vec<_>>>()?;
                        tree.insert(name, ParamValue::Structs(structs));
                    } else {
                        let literals = items
                            .iter()
                            .map(|item| {
                                json_scalar(item).ok_or_else(|| {
                                    serialization_error(format!(
                                        "list '{name}' mixes structs and literals"
                                    ))
                                })
                            })
                            .collect::<Result<Vec<_>>>()?;
                        tree.insert(name, ParamValue::Literals(literals));
                    }
                }
                other => {
                    let scalar = json_scalar(&other).ok_or_else(|| {
                        serialization_error(format!("field '{name}' is a nested object"))
                    })?;
                    tree.insert(name, ParamValue::Scalar(scalar));
                }
            }
        }
        Ok(tree)
    }
}

impl<'a> IntoIterator for &'a ParameterTree {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

fn json_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_struct(name: &str, value: &serde_json::Value) -> Result<ParamStruct> {
    let mut item = ParamStruct::new();
    if let serde_json::Value::Object(fields) = value {
        for (field, field_value) in fields {
            if field_value.is_null() {
                continue;
            }
            let scalar = json_scalar(field_value).ok_or_else(|| {
                serialization_error(format!("field '{name}.{field}' is not a scalar"))
            })?;
            item.insert(field.clone(), scalar);
        }
    }
    Ok(item)
}

fn serialization_error(detail: impl Into<String>) -> ProviderError {
    ProviderError::SerializationError {
        provider: "codec".to_string(),
        detail: detail.into(),
    }
}

// ============ Flat parameters ============

/// Wire representation: dotted key -> exactly one scalar value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatParams(BTreeMap<String, String>);

impl FlatParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Looks up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs whose key sits under `prefix.`, in key order.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + use<'a> {
        let start = format!("{prefix}.");
        self.0
            .range(start.clone()..)
            .take_while(move |(key, _)| key.starts_with(&start))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses a URL query string (with or without the leading `?`).
    ///
    /// A key that occurs more than once is a [`ProviderError::MalformedKey`]: flat
    /// parameters never carry multiple values per key.
    pub fn from_query_string(query: &str) -> Result<Self> {
        let mut params = Self::new();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = query_decode(raw_key)?;
            let value = query_decode(raw_value)?;
            if params.0.contains_key(&key) {
                return Err(ProviderError::malformed_key(
                    key,
                    "key occurs more than once in the query string",
                ));
            }
            params.0.insert(key, value);
        }
        Ok(params)
    }

    /// Renders a query string with sorted keys and RFC 3986 encoding.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for FlatParams {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for FlatParams {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// RFC 3986 percent-encoding (unreserved characters pass through).
pub fn url_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn query_decode(raw: &str) -> Result<String> {
    let plus_as_space = raw.replace('+', " ");
    urlencoding::decode(&plus_as_space)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ProviderError::malformed_key(raw, format!("invalid percent-encoding: {e}")))
}

// ============ Convention ============

/// How a list is spelled on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConvention {
    member_infix: Option<String>,
    first_index: u32,
}

impl ListConvention {
    /// `Name.member.1`, `Name.member.2`, ... (AWS query APIs).
    pub fn member() -> Self {
        Self::new(Some("member"), 1)
    }

    /// `name.0`, `name.1`, ... (zero-based, no infix).
    pub fn zero_based() -> Self {
        Self::new(None, 0)
    }

    /// A custom convention.
    pub fn new(member_infix: Option<&str>, first_index: u32) -> Self {
        Self {
            member_infix: member_infix.map(ToString::to_string),
            first_index,
        }
    }

    /// Index of the first list element on the wire.
    pub fn first_index(&self) -> u32 {
        self.first_index
    }

    /// Key prefix under which list `name` is spelled out.
    pub fn list_prefix(&self, name: &str) -> String {
        match &self.member_infix {
            Some(infix) => format!("{name}.{infix}"),
            None => name.to_string(),
        }
    }
}

impl Default for ListConvention {
    fn default() -> Self {
        Self::member()
    }
}

// ============ Codec ============

/// Encodes [`ParameterTree`]s into [`FlatParams`] and decodes them back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamCodec {
    convention: ListConvention,
}

impl ParamCodec {
    /// Creates a codec for the given list convention.
    pub fn new(convention: ListConvention) -> Self {
        Self { convention }
    }

    /// The list convention in use.
    pub fn convention(&self) -> &ListConvention {
        &self.convention
    }

    /// Key prefix for list `name` under this codec's convention.
    pub fn list_prefix(&self, name: &str) -> String {
        self.convention.list_prefix(name)
    }

    /// Flattens a tree.
    ///
    /// Scalar, list and field names must be non-empty and free of `.`, which also
    /// keeps every produced key distinct. Nothing is coerced.
    pub fn encode(&self, tree: &ParameterTree) -> Result<FlatParams> {
        let mut flat = FlatParams::new();

        for (name, value) in tree {
            match value {
                ParamValue::Scalar(scalar) => {
                    check_segment(name, name)?;
                    flat.insert(name.clone(), scalar.clone());
                }
                ParamValue::Literals(values) => {
                    check_segment(name, name)?;
                    let prefix = self.list_prefix(name);
                    for (offset, literal) in values.iter().enumerate() {
                        let index = self.index_at(&prefix, offset)?;
                        flat.insert(format!("{prefix}.{index}"), literal.clone());
                    }
                }
                ParamValue::Structs(items) => {
                    check_segment(name, name)?;
                    let prefix = self.list_prefix(name);
                    for (offset, item) in items.iter().enumerate() {
                        let index = self.index_at(&prefix, offset)?;
                        if item.is_empty() {
                            return Err(ProviderError::malformed_key(
                                format!("{prefix}.{index}"),
                                "struct has no fields",
                            ));
                        }
                        for (field, field_value) in item {
                            let key = format!("{prefix}.{index}.{field}");
                            check_segment(&key, field)?;
                            flat.insert(key, field_value.clone());
                        }
                    }
                }
            }
        }

        Ok(flat)
    }

    /// Reads back a list of literals spelled under `prefix` (e.g. `Foo.member`).
    ///
    /// Every matching key must be `prefix` plus exactly one index segment. Values
    /// come back in index order; indices must run contiguously from the
    /// convention's first index. No matching keys yields an empty list.
    pub fn decode_list_of_literals(&self, flat: &FlatParams, prefix: &str) -> Result<Vec<String>> {
        let expected_segments = segment_count(prefix) + 1;

        let mut entries = Vec::new();
        for (key, value) in flat.with_prefix(prefix) {
            let parts: Vec<&str> = key.split('.').collect();
            if parts.len() != expected_segments {
                return Err(ProviderError::malformed_key(
                    key,
                    format!(
                        "expected {expected_segments} dot-separated segments, found {}",
                        parts.len()
                    ),
                ));
            }
            let index = parse_index(key, parts[expected_segments - 1])?;
            entries.push((index, key, value));
        }
        entries.sort_by_key(|(index, _, _)| *index);

        let mut values = Vec::with_capacity(entries.len());
        let mut previous = None;
        for (index, key, value) in entries {
            self.check_next_index(key, previous, index)?;
            values.push(value.to_string());
            previous = Some(index);
        }

        Ok(values)
    }

    /// Reads back a list of structs spelled under `prefix` (e.g. `Listeners.member`).
    ///
    /// Keys must have 3 or 4 segments: `prefix`, the numeric index, the field name.
    /// Fields are grouped into one struct per index, in index order. A gap in the
    /// indices, an index below the first one, or a field given twice for the same
    /// index is a [`ProviderError::MalformedKey`].
    pub fn decode_list_of_structs(
        &self,
        flat: &FlatParams,
        prefix: &str,
    ) -> Result<Vec<ParamStruct>> {
        let expected_segments = segment_count(prefix) + 2;

        let mut entries = Vec::new();
        for (key, value) in flat.with_prefix(prefix) {
            let parts: Vec<&str> = key.split('.').collect();
            if !(3..=4).contains(&parts.len()) || parts.len() != expected_segments {
                return Err(ProviderError::malformed_key(
                    key,
                    format!(
                        "expected {expected_segments} dot-separated segments (prefix, index, field), found {}",
                        parts.len()
                    ),
                ));
            }
            let index = parse_index(key, parts[parts.len() - 2])?;
            let field = parts[parts.len() - 1];
            if field.is_empty() {
                return Err(ProviderError::malformed_key(key, "empty field name"));
            }
            entries.push((index, field, key, value));
        }
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut structs = Vec::new();
        let mut current: Option<(u32, ParamStruct)> = None;
        for (index, field, key, value) in entries {
            let previous = current.as_ref().map(|(i, _)| *i);
            if previous != Some(index) {
                self.check_next_index(key, previous, index)?;
                if let Some((_, done)) = current.take() {
                    structs.push(done);
                }
                current = Some((index, ParamStruct::new()));
            }
            if let Some((_, item)) = current.as_mut()
                && item.insert(field.to_string(), value.to_string()).is_some()
            {
                return Err(ProviderError::malformed_key(
                    key,
                    format!("field '{field}' given more than once for index {index}"),
                ));
            }
        }
        if let Some((_, done)) = current {
            structs.push(done);
        }

        Ok(structs)
    }

    /// Reassembles a tree from `flat`, reading each name as the given kind.
    ///
    /// Missing scalars and empty lists are left out of the result.
    pub fn decode(&self, flat: &FlatParams, schema: &[(&str, ParamKind)]) -> Result<ParameterTree> {
        let mut tree = ParameterTree::new();
        for (name, kind) in schema {
            match kind {
                ParamKind::Scalar => {
                    if let Some(value) = flat.get(name) {
                        tree.insert(*name, ParamValue::Scalar(value.to_string()));
                    }
                }
                ParamKind::Literals => {
                    let values = self.decode_list_of_literals(flat, &self.list_prefix(name))?;
                    if !values.is_empty() {
                        tree.insert(*name, ParamValue::Literals(values));
                    }
                }
                ParamKind::Structs => {
                    let items = self.decode_list_of_structs(flat, &self.list_prefix(name))?;
                    if !items.is_empty() {
                        tree.insert(*name, ParamValue::Structs(items));
                    }
                }
            }
        }
        Ok(tree)
    }

    fn index_at(&self, prefix: &str, offset: usize) -> Result<u32> {
        u32::try_from(offset)
            .ok()
            .and_then(|offset| offset.checked_add(self.convention.first_index))
            .ok_or_else(|| ProviderError::malformed_key(prefix, "list too long to index"))
    }

    /// Indices must open at the first index and then grow by exactly one.
    ///
    /// `index` values arrive sorted ascending, so a repeat or a jump is the only
    /// way out of sequence.
    fn check_next_index(&self, key: &str, previous: Option<u32>, index: u32) -> Result<()> {
        let expected = match previous {
            None => self.convention.first_index,
            Some(prev) if index == prev => {
                return Err(ProviderError::malformed_key(
                    key,
                    format!("index {index} given more than once"),
                ));
            }
            Some(prev) => prev.saturating_add(1),
        };
        if index == expected {
            Ok(())
        } else {
            Err(ProviderError::malformed_key(
                key,
                format!("expected index {expected}, found {index}"),
            ))
        }
    }
}

fn segment_count(prefix: &str) -> usize {
    prefix.split('.').count()
}

fn parse_index(key: &str, segment: &str) -> Result<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProviderError::malformed_key(
            key,
            format!("index segment '{segment}' is not a number"),
        ));
    }
    segment
        .parse::<u32>()
        .map_err(|e| ProviderError::malformed_key(key, format!("index out of range: {e}")))
}

fn check_segment(key: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(ProviderError::malformed_key(key, "empty name segment"));
    }
    if segment.contains('.') {
        return Err(ProviderError::malformed_key(
            key,
            format!("name '{segment}' must not contain '.'"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(fields: &[(&str, &str)]) -> ParamStruct {
        fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn sample_tree() -> ParameterTree {
        ParameterTree::new()
            .scalar("Action", "CreateLoadBalancer")
            .scalar("LoadBalancerName", "web")
            .literals("AvailabilityZones", ["a", "b", "c"])
            .structs(
                "Listeners",
                [item(&[("A", "1"), ("B", "2")]), item(&[("A", "3")])],
            )
    }

    const SCHEMA: &[(&str, ParamKind)] = &[
        ("Action", ParamKind::Scalar),
        ("LoadBalancerName", ParamKind::Scalar),
        ("AvailabilityZones", ParamKind::Literals),
        ("Listeners", ParamKind::Structs),
    ];

    // ---- encode ----

    #[test]
    fn encode_member_convention() {
        let flat = ParamCodec::new(ListConvention::member())
            .encode(&sample_tree())
            .unwrap();

        assert_eq!(flat.get("Action"), Some("CreateLoadBalancer"));
        assert_eq!(flat.get("AvailabilityZones.member.1"), Some("a"));
        assert_eq!(flat.get("AvailabilityZones.member.3"), Some("c"));
        assert_eq!(flat.get("Listeners.member.1.A"), Some("1"));
        assert_eq!(flat.get("Listeners.member.1.B"), Some("2"));
        assert_eq!(flat.get("Listeners.member.2.A"), Some("3"));
        assert_eq!(flat.len(), 8);
    }

    #[test]
    fn encode_zero_based_convention() {
        let flat = ParamCodec::new(ListConvention::zero_based())
            .encode(&sample_tree())
            .unwrap();

        assert_eq!(flat.get("AvailabilityZones.0"), Some("a"));
        assert_eq!(flat.get("AvailabilityZones.2"), Some("c"));
        assert_eq!(flat.get("Listeners.0.B"), Some("2"));
        assert_eq!(flat.get("Listeners.1.A"), Some("3"));
        assert!(!flat.contains_key("AvailabilityZones.3"));
    }

    #[test]
    fn encode_rejects_dotted_field() {
        let tree = ParameterTree::new().structs("Tags", [item(&[("Key.Name", "x")])]);
        let result = ParamCodec::default().encode(&tree);
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { .. })),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn encode_rejects_empty_struct() {
        let tree = ParameterTree::new().structs("Tags", [ParamStruct::new()]);
        assert!(ParamCodec::default().encode(&tree).is_err());
    }

    #[test]
    fn encode_rejects_dotted_or_empty_scalar_name() {
        // would otherwise collide with `Zones.member.1` from the list
        let tree = ParameterTree::new()
            .scalar("Zones.member.1", "x")
            .literals("Zones", ["y"]);
        let result = ParamCodec::default().encode(&tree);
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { key, .. }) if key == "Zones.member.1"),
            "unexpected result: {result:?}"
        );

        let tree = ParameterTree::new().scalar("", "x");
        assert!(matches!(
            ParamCodec::default().encode(&tree),
            Err(ProviderError::MalformedKey { .. })
        ));
    }

    // ---- round trip ----

    #[test]
    fn round_trip_member_convention() {
        let codec = ParamCodec::new(ListConvention::member());
        let tree = sample_tree();
        let flat = codec.encode(&tree).unwrap();
        let decoded = codec.decode(&flat, SCHEMA).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(codec.encode(&decoded).unwrap(), flat);
    }

    #[test]
    fn round_trip_zero_based_convention() {
        let codec = ParamCodec::new(ListConvention::zero_based());
        let tree = sample_tree();
        let flat = codec.encode(&tree).unwrap();
        let decoded = codec.decode(&flat, SCHEMA).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(codec.encode(&decoded).unwrap(), flat);
    }

    #[test]
    fn round_trip_keeps_order_past_nine() {
        let codec = ParamCodec::new(ListConvention::member());
        let values: Vec<String> = (0..12).map(|i| format!("v{i}")).collect();
        let tree = ParameterTree::new().literals("Ids", values.clone());
        let flat = codec.encode(&tree).unwrap();
        assert_eq!(
            codec.decode_list_of_literals(&flat, "Ids.member").unwrap(),
            values
        );
    }

    // ---- decode literals ----

    #[test]
    fn decode_literals_no_match_is_empty() {
        let flat: FlatParams = [("Other.member.1", "x")].into_iter().collect();
        let values = ParamCodec::default()
            .decode_list_of_literals(&flat, "Foo.member")
            .unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn decode_literals_ignores_longer_names_sharing_prefix() {
        let flat: FlatParams = [("Foo.member.1", "a"), ("FooBar.member.1", "x")]
            .into_iter()
            .collect();
        let values = ParamCodec::default()
            .decode_list_of_literals(&flat, "Foo.member")
            .unwrap();
        assert_eq!(values, vec!["a"]);
    }

    #[test]
    fn decode_literals_rejects_extra_segment() {
        let flat: FlatParams = [("Foo.member.1.x", "a")].into_iter().collect();
        let result = ParamCodec::default().decode_list_of_literals(&flat, "Foo.member");
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { .. })),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn decode_literals_rejects_gap() {
        let flat: FlatParams = [("Foo.member.1", "a"), ("Foo.member.3", "c")]
            .into_iter()
            .collect();
        assert!(
            ParamCodec::default()
                .decode_list_of_literals(&flat, "Foo.member")
                .is_err()
        );
    }

    #[test]
    fn decode_literals_rejects_same_index_twice() {
        let flat: FlatParams = [("Foo.member.1", "a"), ("Foo.member.01", "b")]
            .into_iter()
            .collect();
        let result = ParamCodec::default().decode_list_of_literals(&flat, "Foo.member");
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { detail, .. }) if detail.contains("more than once")),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn decode_literals_rejects_non_numeric_index() {
        let flat: FlatParams = [("Foo.member.one", "a")].into_iter().collect();
        assert!(
            ParamCodec::default()
                .decode_list_of_literals(&flat, "Foo.member")
                .is_err()
        );
    }

    // ---- decode structs ----

    #[test]
    fn decode_structs_rejects_five_segments() {
        let flat: FlatParams = [("Foo.member.1.A", "x"), ("Foo.member.1.A.extra", "y")]
            .into_iter()
            .collect();
        let result = ParamCodec::default().decode_list_of_structs(&flat, "Foo.member");
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { key, .. }) if key == "Foo.member.1.A.extra"),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn decode_structs_zero_based_three_segments() {
        let flat: FlatParams = [
            ("realiplist.0.ip", "10.0.0.1"),
            ("realiplist.1.ip", "10.0.0.2"),
            ("realiplist.1.port", "80"),
        ]
        .into_iter()
        .collect();
        let codec = ParamCodec::new(ListConvention::zero_based());
        let items = codec.decode_list_of_structs(&flat, "realiplist").unwrap();
        assert_eq!(
            items,
            vec![
                item(&[("ip", "10.0.0.1")]),
                item(&[("ip", "10.0.0.2"), ("port", "80")]),
            ]
        );
    }

    #[test]
    fn decode_structs_rejects_duplicate_field() {
        let flat: FlatParams = [("Foo.member.1.A", "x"), ("Foo.member.01.A", "y")]
            .into_iter()
            .collect();
        let result = ParamCodec::default().decode_list_of_structs(&flat, "Foo.member");
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { detail, .. }) if detail.contains("field 'A'")),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn decode_structs_rejects_index_below_first() {
        let flat: FlatParams = [("Foo.member.0.A", "x")].into_iter().collect();
        assert!(
            ParamCodec::new(ListConvention::member())
                .decode_list_of_structs(&flat, "Foo.member")
                .is_err()
        );
    }

    #[test]
    fn decode_structs_rejects_gap() {
        let flat: FlatParams = [("Foo.member.1.A", "x"), ("Foo.member.3.A", "y")]
            .into_iter()
            .collect();
        let result = ParamCodec::default().decode_list_of_structs(&flat, "Foo.member");
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { key, detail }) if key == "Foo.member.3.A" && detail.contains("expected index 2")),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn decode_structs_orders_by_number_not_text() {
        // lexically `10` sorts before `2`
        let mut flat = FlatParams::new();
        for i in 1..=10 {
            flat.insert(format!("Foo.member.{i}.A"), i.to_string());
        }
        let items = ParamCodec::default()
            .decode_list_of_structs(&flat, "Foo.member")
            .unwrap();
        let values: Vec<&str> = items
            .iter()
            .filter_map(|item| item.get("A").map(String::as_str))
            .collect();
        assert_eq!(values, ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);
    }

    #[test]
    fn decode_structs_no_match_is_empty() {
        let items = ParamCodec::default()
            .decode_list_of_structs(&FlatParams::new(), "Foo.member")
            .unwrap();
        assert!(items.is_empty());
    }

    // ---- query strings ----

    #[test]
    fn query_string_round_trip() {
        let flat: FlatParams = [("b", "hello world"), ("a", "x/y"), ("Foo.member.1", "é")]
            .into_iter()
            .collect();
        let qs = flat.to_query_string();
        assert_eq!(qs, "Foo.member.1=%C3%A9&a=x%2Fy&b=hello%20world");
        assert_eq!(FlatParams::from_query_string(&qs).unwrap(), flat);
    }

    #[test]
    fn query_string_plus_is_space() {
        let flat = FlatParams::from_query_string("?name=a+b&empty=").unwrap();
        assert_eq!(flat.get("name"), Some("a b"));
        assert_eq!(flat.get("empty"), Some(""));
    }

    #[test]
    fn query_string_rejects_repeated_key() {
        let result = FlatParams::from_query_string("a=1&a=2");
        assert!(
            matches!(&result, Err(ProviderError::MalformedKey { key, .. }) if key == "a"),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn url_encode_unreserved_and_reserved() {
        assert_eq!(url_encode("abc-._~123"), "abc-._~123");
        assert_eq!(url_encode("&= /?"), "%26%3D%20%2F%3F");
        assert_eq!(url_encode("你好"), "%E4%BD%A0%E5%A5%BD");
    }

    // ---- from_serialize ----

    #[test]
    fn from_serialize_maps_shapes() {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Params {
            db_instance_identifier: String,
            allocated_storage: u32,
            vpc_security_group_ids: Vec<String>,
            tags: Vec<BTreeMap<String, String>>,
            option_group_name: Option<String>,
        }

        let tree = ParameterTree::from_serialize(&Params {
            db_instance_identifier: "db1".into(),
            allocated_storage: 5,
            vpc_security_group_ids: vec!["sg-1".into()],
            tags: vec![item(&[("Key", "env"), ("Value", "test")])],
            option_group_name: None,
        })
        .unwrap();

        assert_eq!(tree.get_scalar("DbInstanceIdentifier"), Some("db1"));
        assert_eq!(tree.get_scalar("AllocatedStorage"), Some("5"));
        assert_eq!(
            tree.get("VpcSecurityGroupIds"),
            Some(&ParamValue::Literals(vec!["sg-1".into()]))
        );
        assert!(matches!(tree.get("Tags"), Some(ParamValue::Structs(items)) if items.len() == 1));
        assert!(tree.get("OptionGroupName").is_none());
    }

    #[test]
    fn from_serialize_rejects_nested_object() {
        let value = serde_json::json!({"Endpoint": {"Port": 5432}});
        let result = ParameterTree::from_serialize(&value);
        assert!(
            matches!(&result, Err(ProviderError::SerializationError { .. })),
            "unexpected result: {result:?}"
        );
    }
}

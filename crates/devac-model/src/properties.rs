use serde::de::DeserializeOwned;
use serde_json::Value;

/// A free-form property bag, as described by Design Notes: stored as an
/// opaque serialized JSON payload at rest, with a typed accessor for known
/// keys. Parsers are free to attach whatever extension fields they like;
/// the store never imposes a static schema on this field.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(Value);

impl PropertyBag {
    pub fn empty() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Deserializes the value stored under `key`, returning `None` if the
    /// key is absent or the bag is not an object.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0.as_object()?.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set(&mut self, key: &str, value: impl serde::Serialize) {
        if !self.0.is_object() {
            self.0 = Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.0.as_object_mut() {
            map.insert(key.to_string(), serde_json::to_value(value).unwrap_or(Value::Null));
        }
    }

    /// The serialized form persisted to the `properties` column (spec §6:
    /// "free-form `properties` as serialized JSON strings").
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    pub fn from_json_string(s: &str) -> serde_json::Result<Self> {
        Ok(Self(serde_json::from_str(s)?))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_typed_values() {
        let mut bag = PropertyBag::empty();
        bag.set("is_external", true);
        bag.set("callee_name", "fetch");
        assert_eq!(bag.get::<bool>("is_external"), Some(true));
        assert_eq!(bag.get::<String>("callee_name"), Some("fetch".to_string()));
        assert_eq!(bag.get::<String>("missing"), None);
    }

    #[test]
    fn serialized_form_round_trips() {
        let mut bag = PropertyBag::empty();
        bag.set("n", 42);
        let s = bag.to_json_string();
        let back = PropertyBag::from_json_string(&s).unwrap();
        assert_eq!(bag, back);
    }
}

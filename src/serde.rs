#![cfg(feature="serde")]
use super::serialize::{Scalar, Snapshot};

use std::marker::PhantomData;
use std::fmt;

use serde::{de, de::{Deserializer, MapAccess, Visitor}, ser::{Serialize, SerializeMap, Serializer}, Deserialize};

const COUNTS: &str = "counts";

impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where S: Serializer {
        match *self {
            Scalar::Int(v) => serializer.serialize_i64(v),
            Scalar::Float(v) => serializer.serialize_f64(v),
        }
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer or floating point snapshot field")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where E: de::Error,
    {
        Ok(Scalar::Int(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where E: de::Error,
    {
        match i64::try_from(value) {
            Ok(v) => Ok(Scalar::Int(v)),
            Err(_) => Err(E::custom(format!("field value {} too large", value)))
        }
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where E: de::Error,
    {
        Ok(Scalar::Float(value))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl Serialize for Snapshot {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where S: Serializer {
        let len = self.fields.len() + if self.counts.is_some() { 1 } else { 0 };
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in self.fields.iter() {
            map.serialize_entry(name, value)?;
        }
        if let Some(counts) = &self.counts {
            map.serialize_entry(COUNTS, counts)?;
        }
        map.end()
    }
}

struct SnapshotVisitor {
    marker: PhantomData<fn() -> Snapshot>
}

impl SnapshotVisitor {
    fn new() -> Self {
        SnapshotVisitor {
            marker: PhantomData
        }
    }
}

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = Snapshot;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a histogram snapshot")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut snapshot = Snapshot::new();
        while let Some(key) = access.next_key::<String>()? {
            if key == COUNTS {
                if snapshot.counts.is_some() {
                    return Err(de::Error::duplicate_field(COUNTS));
                }
                snapshot.set_counts(access.next_value::<Vec<u64>>()?);
            } else {
                let value = access.next_value::<Scalar>()?;
                snapshot.fields.insert(key, value);
            }
        }
        Ok(snapshot)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(SnapshotVisitor::new())
    }
}

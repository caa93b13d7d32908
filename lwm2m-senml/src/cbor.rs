//! CBOR serialization support for SenML
//!
//! SenML-CBOR replaces the JSON field names with the integer labels of
//! RFC 8428 section 6, so records are mapped by hand through
//! [`ciborium::value::Value`] instead of going through serde field names.

use ciborium::value::Value;

use crate::{Result, SenMLError, SenMLNumber, SenMLPack, SenMLRecord};

const BASE_NAME: i64 = -2;
const BASE_TIME: i64 = -3;
const NAME: i64 = 0;
const VALUE: i64 = 2;
const STRING_VALUE: i64 = 3;
const BOOL_VALUE: i64 = 4;
const TIME: i64 = 6;
const DATA_VALUE: i64 = 8;
/// LwM2M object link label, a text key
const OBJLNK_VALUE: &str = "vlo";

impl SenMLPack {
    /// Serialize to CBOR bytes
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let value = Value::Array(self.records.iter().map(record_to_cbor).collect());
        let mut buffer = Vec::new();
        ciborium::ser::into_writer(&value, &mut buffer)
            .map_err(|e| SenMLError::serialization(e.to_string()))?;
        Ok(buffer)
    }

    /// Deserialize from CBOR bytes
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let value: Value = ciborium::de::from_reader(bytes)
            .map_err(|e| SenMLError::deserialization(e.to_string()))?;

        let Value::Array(items) = value else {
            return Err(SenMLError::invalid_data("SenML CBOR pack must be an array"));
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                record_from_cbor(item).map_err(|e| {
                    SenMLError::invalid_data(format!("Invalid record at index {}: {}", index, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SenMLPack { records })
    }
}

fn int_key(label: i64) -> Value {
    Value::Integer(label.into())
}

fn number_to_cbor(number: SenMLNumber) -> Value {
    match number {
        SenMLNumber::Integer(i) => Value::Integer(i.into()),
        SenMLNumber::Unsigned(u) => Value::Integer(u.into()),
        SenMLNumber::Float(f) => Value::Float(f),
    }
}

fn record_to_cbor(record: &SenMLRecord) -> Value {
    let mut map = Vec::new();

    if let Some(bn) = &record.bn {
        map.push((int_key(BASE_NAME), Value::Text(bn.clone())));
    }
    if let Some(bt) = record.bt {
        map.push((int_key(BASE_TIME), number_to_cbor(bt)));
    }
    if let Some(n) = &record.n {
        map.push((int_key(NAME), Value::Text(n.clone())));
    }
    if let Some(t) = record.t {
        map.push((int_key(TIME), number_to_cbor(t)));
    }
    if let Some(v) = record.v {
        map.push((int_key(VALUE), number_to_cbor(v)));
    }
    if let Some(vs) = &record.vs {
        map.push((int_key(STRING_VALUE), Value::Text(vs.clone())));
    }
    if let Some(vb) = record.vb {
        map.push((int_key(BOOL_VALUE), Value::Bool(vb)));
    }
    if let Some(vd) = &record.vd {
        map.push((int_key(DATA_VALUE), Value::Bytes(vd.clone())));
    }
    if let Some(vlo) = &record.vlo {
        map.push((Value::Text(OBJLNK_VALUE.to_string()), Value::Text(vlo.clone())));
    }

    Value::Map(map)
}

fn number_from_cbor(field: &str, value: Value) -> Result<SenMLNumber> {
    match value {
        Value::Integer(i) => {
            let wide = i128::from(i);
            if let Ok(signed) = i64::try_from(wide) {
                Ok(SenMLNumber::Integer(signed))
            } else if let Ok(unsigned) = u64::try_from(wide) {
                Ok(SenMLNumber::Unsigned(unsigned))
            } else {
                Err(SenMLError::invalid_field_value(field, &wide.to_string()))
            }
        }
        Value::Float(f) => Ok(SenMLNumber::Float(f)),
        other => Err(SenMLError::invalid_field_value(field, &format!("{:?}", other))),
    }
}

fn text_from_cbor(field: &str, value: Value) -> Result<String> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(SenMLError::invalid_field_value(field, &format!("{:?}", other))),
    }
}

fn record_from_cbor(value: Value) -> Result<SenMLRecord> {
    let Value::Map(entries) = value else {
        return Err(SenMLError::invalid_data("SenML CBOR record must be a map"));
    };

    let mut record = SenMLRecord::new();
    for (key, value) in entries {
        match key {
            Value::Integer(label) => match i64::try_from(label).ok() {
                Some(BASE_NAME) => record.bn = Some(text_from_cbor("bn", value)?),
                Some(BASE_TIME) => record.bt = Some(number_from_cbor("bt", value)?),
                Some(NAME) => record.n = Some(text_from_cbor("n", value)?),
                Some(TIME) => record.t = Some(number_from_cbor("t", value)?),
                Some(VALUE) => record.v = Some(number_from_cbor("v", value)?),
                Some(STRING_VALUE) => record.vs = Some(text_from_cbor("vs", value)?),
                Some(BOOL_VALUE) => match value {
                    Value::Bool(b) => record.vb = Some(b),
                    other => {
                        return Err(SenMLError::invalid_field_value("vb", &format!("{:?}", other)));
                    }
                },
                Some(DATA_VALUE) => match value {
                    Value::Bytes(bytes) => record.vd = Some(bytes),
                    other => {
                        return Err(SenMLError::invalid_field_value("vd", &format!("{:?}", other)));
                    }
                },
                _ => {}
            },
            Value::Text(label) if label == OBJLNK_VALUE => {
                record.vlo = Some(text_from_cbor(OBJLNK_VALUE, value)?);
            }
            _ => {}
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use crate::{SenMLNumber, SenMLPack, SenMLRecord, SenMLValue};

    #[test]
    fn test_cbor_opaque_record_layout() {
        let mut pack = SenMLPack::new();
        pack.add_record(
            SenMLRecord::new()
                .with_base_name("/0/0/3")
                .with_value(SenMLValue::Data(vec![0xab, 0xcd, 0xef])),
        );

        let cbor = pack.to_cbor().unwrap();
        assert_eq!(hex::encode(&cbor), "81a221662f302f302f330843abcdef");
        assert_eq!(SenMLPack::from_cbor(&cbor).unwrap(), pack);
    }

    #[test]
    fn test_cbor_roundtrip_all_fields() {
        let mut pack = SenMLPack::new();
        pack.add_record(
            SenMLRecord::new()
                .with_base_name("/3/0/")
                .with_base_time(1699877805i64)
                .with_name("7/0")
                .with_time(-2i64)
                .with_value(SenMLValue::Number(SenMLNumber::Unsigned(u64::MAX))),
        );
        pack.add_record(
            SenMLRecord::new()
                .with_name("1")
                .with_value(SenMLValue::String("Lightweight M2M Client".into())),
        );
        pack.add_record(
            SenMLRecord::new()
                .with_name("20")
                .with_value(SenMLValue::Boolean(true)),
        );
        pack.add_record(
            SenMLRecord::new()
                .with_name("22")
                .with_value(SenMLValue::ObjectLink("3:0".into())),
        );
        pack.add_record(
            SenMLRecord::new()
                .with_name("9")
                .with_value(SenMLValue::Number(3.5.into())),
        );

        let cbor = pack.to_cbor().unwrap();
        assert_eq!(SenMLPack::from_cbor(&cbor).unwrap(), pack);
    }

    #[test]
    fn test_cbor_empty_array() {
        let pack = SenMLPack::from_cbor(&[0x80]).unwrap();
        assert!(pack.is_empty());
    }

    #[test]
    fn test_cbor_rejects_non_array() {
        // {0: "x"}
        assert!(SenMLPack::from_cbor(&[0xa1, 0x00, 0x61, 0x78]).is_err());
        // [{0: 1}] : name must be a text string
        assert!(SenMLPack::from_cbor(&[0x81, 0xa1, 0x00, 0x01]).is_err());
        assert!(SenMLPack::from_cbor(&[]).is_err());
    }
}

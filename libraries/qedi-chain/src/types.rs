//! Full-node JSON shapes this crate reads. Only the fields in use are modeled.

use qedi_crypt::hash::Digest;
use qedi_structs::transaction::ExecutionStatus;
use qedi_structs::{ObjectId, ObjectRef, SuiAddress};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{DisplayFromStr, PickFirst, serde_as};

/// Who may use an object. u64 fields arrive as either strings or numbers
/// depending on node version.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum Owner {
    AddressOwner(SuiAddress),
    ObjectOwner(SuiAddress),
    Shared {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        initial_shared_version: u64,
    },
    Immutable,
    ConsensusAddressOwner {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        start_version: u64,
        owner: SuiAddress,
    },
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: ObjectId,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub version: u64,
    pub digest: Digest,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub owner: Option<Owner>,
    /// `{dataType, type, hasPublicTransfer, fields}` for Move objects.
    #[serde(default)]
    pub content: Option<Value>,
}

impl ObjectData {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            object_id: self.object_id,
            version: self.version,
            digest: self.digest,
        }
    }

    /// The `fields` map of a Move object's content.
    pub fn fields(&self) -> Option<&Value> {
        self.content.as_ref()?.get("fields")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ObjectResponse {
    #[serde(default)]
    pub data: Option<ObjectData>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<Value>,
    #[serde(default)]
    pub has_next_page: bool,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub coin_type: String,
    pub coin_object_id: ObjectId,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub version: u64,
    pub digest: Digest,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub balance: u64,
}

impl Coin {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            object_id: self.coin_object_id,
            version: self.version,
            digest: self.digest,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransactionBlockResponse {
    pub digest: Digest,
    #[serde(default)]
    pub effects: Option<Value>,
}

impl TransactionBlockResponse {
    pub fn status(&self) -> Option<ExecutionStatus> {
        let status = self.effects.as_ref()?.get("status")?;
        serde_json::from_value(status.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn owner_variants_parse() {
        let owner: Owner = serde_json::from_value(json!({"Shared": {"initial_shared_version": 9}})).unwrap();
        assert_eq!(owner, Owner::Shared { initial_shared_version: 9 });
        let owner: Owner =
            serde_json::from_value(json!({"Shared": {"initial_shared_version": "9"}})).unwrap();
        assert_eq!(owner, Owner::Shared { initial_shared_version: 9 });
        let owner: Owner = serde_json::from_value(json!("Immutable")).unwrap();
        assert_eq!(owner, Owner::Immutable);
        let owner: Owner = serde_json::from_value(json!({"AddressOwner": "0x5"})).unwrap();
        assert_eq!(owner, Owner::AddressOwner(SuiAddress::from_low_byte(5)));
    }

    #[test]
    fn status_is_read_from_effects() {
        let resp: TransactionBlockResponse = serde_json::from_value(json!({
            "digest": Digest::from_bytes([2; 32]).to_string(),
            "effects": {"status": {"status": "success"}},
        }))
        .unwrap();
        assert_eq!(resp.status(), Some(ExecutionStatus::Success));
    }
}

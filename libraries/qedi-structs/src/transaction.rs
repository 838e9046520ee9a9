//! BCS transaction types in the ledger's canonical layout, and the unresolved
//! [`TransactionPlan`] the builder produces.
//!
//! Variant order in every enum here is part of the wire format.

use derivative::Derivative;
use qedi_crypt::hash::Digest;
use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;

use crate::address::{ObjectId, ObjectRef, SuiAddress};
use crate::contract::MoveCallTarget;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructTag {
    pub address: SuiAddress,
    pub module: String,
    pub name: String,
    pub type_params: Vec<TypeTag>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectArg {
    ImmOrOwnedObject(ObjectRef),
    SharedObject {
        id: ObjectId,
        initial_shared_version: u64,
        mutable: bool,
    },
    Receiving(ObjectRef),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    Pure(Vec<u8>),
    Object(ObjectArg),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableMoveCall {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<Argument>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    MoveCall(Box<ProgrammableMoveCall>),
    TransferObjects(Vec<Argument>, Argument),
    SplitCoins(Argument, Vec<Argument>),
    MergeCoins(Argument, Vec<Argument>),
    Publish(Vec<Vec<u8>>, Vec<ObjectId>),
    MakeMoveVec(Option<TypeTag>, Vec<Argument>),
    Upgrade(Vec<Vec<u8>>, Vec<ObjectId>, ObjectId, Argument),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

/// Only programmable transactions are ever built here; the remaining kinds
/// are system transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    ProgrammableTransaction(ProgrammableTransaction),
}

impl TransactionKind {
    /// `transactionBlockKindBytes`: the kind alone, without gas or sender.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bcs::Error> {
        bcs::to_bytes(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasData {
    pub payment: Vec<ObjectRef>,
    pub owner: SuiAddress,
    pub price: u64,
    pub budget: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionExpiration {
    None,
    Epoch(u64),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDataV1 {
    pub kind: TransactionKind,
    pub sender: SuiAddress,
    pub gas_data: GasData,
    pub expiration: TransactionExpiration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionData {
    V1(TransactionDataV1),
}

impl TransactionData {
    /// A self-paid programmable transaction.
    pub fn programmable(
        sender: SuiAddress,
        payment: Vec<ObjectRef>,
        pt: ProgrammableTransaction,
        budget: u64,
        price: u64,
    ) -> Self {
        TransactionData::V1(TransactionDataV1 {
            kind: TransactionKind::ProgrammableTransaction(pt),
            sender,
            gas_data: GasData {
                payment,
                owner: sender,
                price,
                budget,
            },
            expiration: TransactionExpiration::None,
        })
    }

    pub fn sender(&self) -> SuiAddress {
        match self {
            TransactionData::V1(v1) => v1.sender,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bcs::Error> {
        bcs::to_bytes(self)
    }

    pub fn digest(&self) -> Result<Digest, bcs::Error> {
        Ok(Digest::transaction(&self.to_bytes()?))
    }
}

/// A transaction input before it has been looked up on-chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannedInput {
    Pure(Vec<u8>),
    /// Resolved at submission time to an owned reference or a shared-object
    /// argument, depending on the object's current owner.
    Object { id: ObjectId, mutable: bool },
    /// A shared object whose initial version is already known.
    Shared {
        id: ObjectId,
        initial_shared_version: u64,
        mutable: bool,
    },
}

impl PlannedInput {
    fn object_id(&self) -> Option<ObjectId> {
        match self {
            PlannedInput::Pure(_) => None,
            PlannedInput::Object { id, .. } | PlannedInput::Shared { id, .. } => Some(*id),
        }
    }

    fn upgrade_mutability(&mut self, wanted: bool) {
        match self {
            PlannedInput::Object { mutable, .. } | PlannedInput::Shared { mutable, .. } => {
                *mutable |= wanted
            }
            PlannedInput::Pure(_) => {}
        }
    }
}

/// An unsigned programmable transaction whose object inputs are still ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionPlan {
    pub inputs: Vec<PlannedInput>,
    pub commands: Vec<Command>,
    targets: Vec<MoveCallTarget>,
}

impl TransactionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a BCS-encoded pure value.
    pub fn pure<T: Serialize>(&mut self, value: &T) -> Result<Argument, bcs::Error> {
        let bytes = bcs::to_bytes(value)?;
        Ok(self.push_input(PlannedInput::Pure(bytes)))
    }

    /// Add an object input. Referencing the same object twice yields the same
    /// argument, mutable if either use was.
    pub fn object(&mut self, id: ObjectId, mutable: bool) -> Argument {
        self.dedup_or_push(PlannedInput::Object { id, mutable })
    }

    pub fn shared(&mut self, id: ObjectId, initial_shared_version: u64, mutable: bool) -> Argument {
        self.dedup_or_push(PlannedInput::Shared {
            id,
            initial_shared_version,
            mutable,
        })
    }

    pub fn move_call(
        &mut self,
        target: MoveCallTarget,
        type_arguments: Vec<TypeTag>,
        arguments: Vec<Argument>,
    ) -> Argument {
        let call = ProgrammableMoveCall {
            package: target.package,
            module: target.module.clone(),
            function: target.function.clone(),
            type_arguments,
            arguments,
        };
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
        self.push_command(Command::MoveCall(Box::new(call)))
    }

    pub fn split_coins(&mut self, coin: Argument, amounts: Vec<Argument>) -> Argument {
        self.push_command(Command::SplitCoins(coin, amounts))
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: Argument) -> Argument {
        self.push_command(Command::TransferObjects(objects, recipient))
    }

    /// Distinct move-call targets in first-use order.
    pub fn move_call_targets(&self) -> &[MoveCallTarget] {
        &self.targets
    }

    pub fn move_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::MoveCall(_)))
            .count()
    }

    /// Whether any command spends the gas coin.
    pub fn uses_gas_coin(&self) -> bool {
        self.commands.iter().any(|c| match c {
            Command::SplitCoins(coin, _) => *coin == Argument::GasCoin,
            Command::MergeCoins(coin, _) => *coin == Argument::GasCoin,
            Command::TransferObjects(objects, _) => objects.contains(&Argument::GasCoin),
            _ => false,
        })
    }

    fn dedup_or_push(&mut self, input: PlannedInput) -> Argument {
        let wanted = matches!(
            input,
            PlannedInput::Object { mutable: true, .. } | PlannedInput::Shared { mutable: true, .. }
        );
        if let Some(id) = input.object_id()
            && let Some(index) = self
                .inputs
                .iter()
                .position(|existing| existing.object_id() == Some(id))
        {
            self.inputs[index].upgrade_mutability(wanted);
            return Argument::Input(index as u16);
        }
        self.push_input(input)
    }

    fn push_input(&mut self, input: PlannedInput) -> Argument {
        self.inputs.push(input);
        Argument::Input((self.inputs.len() - 1) as u16)
    }

    fn push_command(&mut self, command: Command) -> Argument {
        self.commands.push(command);
        Argument::Result((self.commands.len() - 1) as u16)
    }
}

/// Step-one output of the sponsorship protocol: the sponsor's digest and the
/// full transaction bytes, now carrying sponsor-paid gas.
#[serde_as]
#[derive(Clone, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct SponsoredTransaction {
    pub digest: Digest,
    #[serde_as(as = "Base64")]
    #[derivative(Debug(format_with = "crate::debug_bytes_len"))]
    pub bytes: Vec<u8>,
}

/// The ledger's verdict, in its JSON shape (`{"status":"failure","error":..}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure { error: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTransaction {
    pub digest: Digest,
    pub status: Option<ExecutionStatus>,
    /// Raw effects as the full node rendered them, when they were readable.
    pub effects: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractCoordinates;

    #[test]
    fn enum_tags_follow_ledger_order() {
        assert_eq!(bcs::to_bytes(&Argument::GasCoin).unwrap(), vec![0]);
        assert_eq!(bcs::to_bytes(&Argument::Input(2)).unwrap(), vec![1, 2, 0]);
        assert_eq!(bcs::to_bytes(&Argument::NestedResult(1, 0)).unwrap(), vec![3, 1, 0, 0, 0]);
        assert_eq!(bcs::to_bytes(&CallArg::Pure(vec![9])).unwrap(), vec![0, 1, 9]);
        let shared = CallArg::Object(ObjectArg::SharedObject {
            id: ObjectId::from_low_byte(6),
            initial_shared_version: 1,
            mutable: false,
        });
        let bytes = bcs::to_bytes(&shared).unwrap();
        assert_eq!(&bytes[..2], &[1, 1]);
        assert_eq!(bytes.len(), 2 + 32 + 8 + 1);
        assert_eq!(bcs::to_bytes(&TypeTag::U64).unwrap(), vec![2]);
    }

    #[test]
    fn object_inputs_are_deduplicated() {
        let mut plan = TransactionPlan::new();
        let profile = ObjectId::from_low_byte(0x42);
        let a = plan.object(profile, false);
        let b = plan.object(profile, true);
        assert_eq!(a, b);
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(
            plan.inputs[0],
            PlannedInput::Object {
                id: profile,
                mutable: true
            }
        );
        let title = plan.pure(&"hello").unwrap();
        assert_eq!(title, Argument::Input(1));
    }

    #[test]
    fn targets_are_listed_once() {
        let coords = ContractCoordinates::new(ObjectId::from_low_byte(1), ObjectId::from_low_byte(2));
        let mut plan = TransactionPlan::new();
        for _ in 0..3 {
            plan.move_call(coords.target("add_link"), vec![], vec![]);
        }
        assert_eq!(plan.move_call_count(), 3);
        assert_eq!(plan.move_call_targets().len(), 1);
        assert!(!plan.uses_gas_coin());
        let coin = plan.split_coins(Argument::GasCoin, vec![]);
        plan.transfer_objects(vec![coin], Argument::Input(0));
        assert!(plan.uses_gas_coin());
    }

    #[test]
    fn transaction_digest_uses_the_data_prefix() {
        let data = TransactionData::programmable(
            SuiAddress::from_low_byte(1),
            vec![],
            ProgrammableTransaction {
                inputs: vec![],
                commands: vec![],
            },
            10_000_000,
            1_000,
        );
        let bytes = data.to_bytes().unwrap();
        // V1, then ProgrammableTransaction, then empty inputs and commands.
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
        assert_eq!(data.digest().unwrap(), Digest::transaction(&bytes));
        let back: TransactionData = bcs::from_bytes(&bytes).unwrap();
        assert_eq!(back.sender(), SuiAddress::from_low_byte(1));
    }

    #[test]
    fn sponsored_transaction_json_shape() {
        let tx = SponsoredTransaction {
            digest: Digest::from_bytes([1u8; 32]),
            bytes: vec![1, 2, 3],
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["bytes"], "AQID");
        assert_eq!(json["digest"], Digest::from_bytes([1u8; 32]).to_string());
        assert!(format!("{tx:?}").contains("[3 bytes]"));
    }

    #[test]
    fn status_matches_node_rendering() {
        let failure: ExecutionStatus = serde_json::from_value(serde_json::json!({
            "status": "failure",
            "error": "MoveAbort(..., 2)"
        }))
        .unwrap();
        assert_eq!(
            failure,
            ExecutionStatus::Failure {
                error: "MoveAbort(..., 2)".into()
            }
        );
    }
}

use qedi_structs::transaction::{CallArg, ObjectArg, PlannedInput, ProgrammableTransaction, TransactionPlan};

use crate::client::ChainClient;
use crate::error::ChainError;
use crate::types::Owner;

impl ChainClient {
    /// Turn a plan into a programmable transaction by looking up every
    /// object input at its current version. Shared objects become
    /// shared-object arguments; everything else is referenced by version.
    pub async fn resolve(&self, plan: &TransactionPlan) -> Result<ProgrammableTransaction, ChainError> {
        let mut inputs = Vec::with_capacity(plan.inputs.len());
        for input in &plan.inputs {
            let arg = match input {
                PlannedInput::Pure(bytes) => CallArg::Pure(bytes.clone()),
                PlannedInput::Shared {
                    id,
                    initial_shared_version,
                    mutable,
                } => CallArg::Object(ObjectArg::SharedObject {
                    id: *id,
                    initial_shared_version: *initial_shared_version,
                    mutable: *mutable,
                }),
                PlannedInput::Object { id, mutable } => {
                    let object = self
                        .get_object(*id)
                        .await?
                        .ok_or(ChainError::ObjectNotFound(*id))?;
                    match object.owner {
                        Some(Owner::Shared {
                            initial_shared_version,
                        }) => CallArg::Object(ObjectArg::SharedObject {
                            id: *id,
                            initial_shared_version,
                            mutable: *mutable,
                        }),
                        _ => CallArg::Object(ObjectArg::ImmOrOwnedObject(object.object_ref())),
                    }
                }
            };
            inputs.push(arg);
        }
        Ok(ProgrammableTransaction {
            inputs,
            commands: plan.commands.clone(),
        })
    }
}

use qedi_structs::contract::{
    ADD_LINK, CLOCK_INITIAL_SHARED_VERSION, CLOCK_OBJECT_ID, CREATE_PROFILE, ContractCoordinates,
    UPDATE_PROFILE,
};
use qedi_structs::profile::{NewLink, ProfileDetails};
use qedi_structs::transaction::{Argument, TransactionPlan};
use qedi_structs::username::Username;
use qedi_structs::{ObjectId, QediError, SuiAddress};
use serde::Serialize;

/// MIST per SUI.
pub const MIST_PER_SUI: u64 = 1_000_000_000;
const SUI_DECIMALS: usize = 9;

/// What a built transaction does, with the inputs it was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    CreateProfile {
        username: Username,
        details: ProfileDetails,
    },
    AddLink {
        profile_id: ObjectId,
        link: NewLink,
    },
    AddLinks {
        profile_id: ObjectId,
        links: Vec<NewLink>,
    },
    RecordClick {
        profile_id: ObjectId,
        link_index: u64,
    },
    UpdateProfile {
        profile_id: ObjectId,
        details: ProfileDetails,
    },
    Donation {
        recipient: SuiAddress,
        amount_mist: u64,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateProfile { .. } => "create_profile",
            Action::AddLink { .. } => "add_link",
            Action::AddLinks { .. } => "add_links",
            Action::RecordClick { .. } => "record_click",
            Action::UpdateProfile { .. } => "update_profile",
            Action::Donation { .. } => "donation",
        }
    }
}

/// An unsigned transaction and the action it encodes.
#[derive(Clone, Debug)]
pub struct PreparedTransaction {
    pub action: Action,
    pub plan: TransactionPlan,
}

impl PreparedTransaction {
    /// Move-call targets to restrict a sponsor to.
    pub fn allowed_targets(&self) -> Vec<String> {
        self.plan
            .move_call_targets()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

/// Builds unsigned transactions for the profile contract. Pure: nothing here
/// touches the network.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    contract: ContractCoordinates,
}

fn pure(plan: &mut TransactionPlan, value: &impl Serialize) -> Result<Argument, QediError> {
    plan.pure(value)
        .map_err(|err| QediError::validation(format!("cannot encode argument: {err}")))
}

impl TransactionBuilder {
    pub fn new(contract: ContractCoordinates) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &ContractCoordinates {
        &self.contract
    }

    fn clock(plan: &mut TransactionPlan) -> Argument {
        plan.shared(CLOCK_OBJECT_ID, CLOCK_INITIAL_SHARED_VERSION, false)
    }

    pub fn create_profile(
        &self,
        username: &str,
        details: &ProfileDetails,
    ) -> Result<PreparedTransaction, QediError> {
        let username = Username::parse(username).map_err(QediError::validation)?;
        details.validate()?;

        let mut plan = TransactionPlan::new();
        let registry = plan.object(self.contract.registry_id, true);
        let mut args = vec![registry, pure(&mut plan, &username.as_str())?];
        args.extend(self.detail_args(&mut plan, details)?);
        args.push(Self::clock(&mut plan));
        plan.move_call(self.contract.target(CREATE_PROFILE), vec![], args);

        Ok(PreparedTransaction {
            action: Action::CreateProfile {
                username,
                details: details.clone(),
            },
            plan,
        })
    }

    pub fn add_link(
        &self,
        profile_id: ObjectId,
        link: &NewLink,
    ) -> Result<PreparedTransaction, QediError> {
        link.validate()?;
        let mut plan = TransactionPlan::new();
        self.push_add_link(&mut plan, profile_id, link)?;
        Ok(PreparedTransaction {
            action: Action::AddLink {
                profile_id,
                link: link.clone(),
            },
            plan,
        })
    }

    /// One transaction with an `add_link` call per link, applied atomically.
    pub fn add_links(
        &self,
        profile_id: ObjectId,
        links: &[NewLink],
    ) -> Result<PreparedTransaction, QediError> {
        if links.is_empty() {
            return Err(QediError::validation("no links to add"));
        }
        for link in links {
            link.validate()?;
        }
        let mut plan = TransactionPlan::new();
        for link in links {
            self.push_add_link(&mut plan, profile_id, link)?;
        }
        Ok(PreparedTransaction {
            action: Action::AddLinks {
                profile_id,
                links: links.to_vec(),
            },
            plan,
        })
    }

    fn push_add_link(
        &self,
        plan: &mut TransactionPlan,
        profile_id: ObjectId,
        link: &NewLink,
    ) -> Result<(), QediError> {
        let profile = plan.object(profile_id, true);
        let title = pure(plan, &link.title)?;
        let url = pure(plan, &link.url)?;
        let icon = pure(plan, &link.icon.as_str())?;
        let clock = Self::clock(plan);
        plan.move_call(
            self.contract.target(ADD_LINK),
            vec![],
            vec![profile, title, url, icon, clock],
        );
        Ok(())
    }

    /// The index is not checked against the profile's links; the contract
    /// aborts on an out-of-range index.
    pub fn record_click(
        &self,
        profile_id: ObjectId,
        link_index: u64,
    ) -> Result<PreparedTransaction, QediError> {
        let mut plan = TransactionPlan::new();
        let profile = plan.object(profile_id, true);
        let index = pure(&mut plan, &link_index)?;
        let clock = Self::clock(&mut plan);
        plan.move_call(self.contract.click_target(), vec![], vec![profile, index, clock]);
        Ok(PreparedTransaction {
            action: Action::RecordClick {
                profile_id,
                link_index,
            },
            plan,
        })
    }

    pub fn update_profile(
        &self,
        profile_id: ObjectId,
        details: &ProfileDetails,
    ) -> Result<PreparedTransaction, QediError> {
        details.validate()?;
        let mut plan = TransactionPlan::new();
        let mut args = vec![plan.object(profile_id, true)];
        args.extend(self.detail_args(&mut plan, details)?);
        args.push(Self::clock(&mut plan));
        plan.move_call(self.contract.target(UPDATE_PROFILE), vec![], args);
        Ok(PreparedTransaction {
            action: Action::UpdateProfile {
                profile_id,
                details: details.clone(),
            },
            plan,
        })
    }

    /// Split `amount_mist` off the sender's gas coin and send it to `recipient`.
    pub fn donation(
        &self,
        recipient: SuiAddress,
        amount_mist: u64,
    ) -> Result<PreparedTransaction, QediError> {
        if amount_mist == 0 {
            return Err(QediError::validation("donation amount must be positive"));
        }
        let mut plan = TransactionPlan::new();
        let amount = pure(&mut plan, &amount_mist)?;
        let coin = plan.split_coins(Argument::GasCoin, vec![amount]);
        let recipient_arg = pure(&mut plan, &recipient)?;
        plan.transfer_objects(vec![coin], recipient_arg);
        Ok(PreparedTransaction {
            action: Action::Donation {
                recipient,
                amount_mist,
            },
            plan,
        })
    }

    fn detail_args(
        &self,
        plan: &mut TransactionPlan,
        details: &ProfileDetails,
    ) -> Result<Vec<Argument>, QediError> {
        Ok(vec![
            pure(plan, &details.display_name)?,
            pure(plan, &details.bio)?,
            pure(plan, &details.avatar_url)?,
            pure(plan, &details.theme)?,
        ])
    }
}

/// Parse a SUI amount like `1.5` into MIST. Digits past the ninth decimal
/// are dropped.
pub fn parse_sui_amount(input: &str) -> Result<u64, QediError> {
    let input = input.trim();
    let invalid = || QediError::validation(format!("invalid SUI amount {input:?}"));
    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let mut frac: String = frac.chars().take(SUI_DECIMALS).collect();
    while frac.len() < SUI_DECIMALS {
        frac.push('0');
    }
    let frac: u64 = frac.parse().map_err(|_| invalid())?;
    let mist = whole
        .checked_mul(MIST_PER_SUI)
        .and_then(|m| m.checked_add(frac))
        .ok_or_else(invalid)?;
    if mist == 0 {
        return Err(QediError::validation("donation amount must be positive"));
    }
    Ok(mist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qedi_structs::profile::LinkIcon;
    use qedi_structs::transaction::{Command, PlannedInput};

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(ContractCoordinates::new(
            ObjectId::from_low_byte(0xaa),
            ObjectId::from_low_byte(0xbb),
        ))
    }

    fn move_call(plan: &TransactionPlan, index: usize) -> &qedi_structs::transaction::ProgrammableMoveCall {
        match &plan.commands[index] {
            Command::MoveCall(call) => &**call,
            other => panic!("expected move call, got {other:?}"),
        }
    }

    #[test]
    fn short_username_is_rejected_before_building() {
        let details = ProfileDetails::new("X");
        assert_eq!(details.theme, "default");
        let err = builder().create_profile("ab", &details).unwrap_err();
        assert!(matches!(err, QediError::Validation(_)));
    }

    #[test]
    fn every_out_of_range_username_is_rejected() {
        let details = ProfileDetails::new("Name");
        for length in 0..=30 {
            let result = builder().create_profile(&"u".repeat(length), &details);
            assert_eq!(result.is_ok(), (3..=20).contains(&length), "length {length}");
        }
    }

    #[test]
    fn create_profile_arguments_follow_the_entry_signature() {
        let mut details = ProfileDetails::new("Alice");
        details.bio = "hi".into();
        let tx = builder().create_profile("alice", &details).unwrap();
        let call = move_call(&tx.plan, 0);
        assert_eq!(call.function, "create_profile");
        assert_eq!(call.module, "linktree");
        assert_eq!(call.arguments.len(), 7);
        assert_eq!(
            tx.plan.inputs[0],
            PlannedInput::Object {
                id: ObjectId::from_low_byte(0xbb),
                mutable: true
            }
        );
        assert_eq!(tx.plan.inputs[1], PlannedInput::Pure(bcs::to_bytes("alice").unwrap()));
        assert_eq!(
            tx.plan.inputs.last(),
            Some(&PlannedInput::Shared {
                id: CLOCK_OBJECT_ID,
                initial_shared_version: 1,
                mutable: false
            })
        );
        assert_eq!(tx.allowed_targets().len(), 1);
        assert!(tx.allowed_targets()[0].ends_with("::linktree::create_profile"));
    }

    #[test]
    fn batched_links_share_profile_and_clock() {
        let links: Vec<_> = (0..4)
            .map(|i| NewLink::new(format!("link {i}"), format!("example.com/{i}"), LinkIcon::Website))
            .collect();
        let tx = builder().add_links(ObjectId::from_low_byte(1), &links).unwrap();
        assert_eq!(tx.plan.move_call_count(), 4);
        let objects = tx
            .plan
            .inputs
            .iter()
            .filter(|i| !matches!(i, PlannedInput::Pure(_)))
            .count();
        assert_eq!(objects, 2);
        assert_eq!(tx.allowed_targets().len(), 1);
    }

    #[test]
    fn empty_or_invalid_batches_fail_whole() {
        let profile = ObjectId::from_low_byte(1);
        assert!(builder().add_links(profile, &[]).is_err());
        let links = vec![
            NewLink::new("ok", "example.com", LinkIcon::Link),
            NewLink::new("", "example.com", LinkIcon::Link),
        ];
        assert!(matches!(
            builder().add_links(profile, &links),
            Err(QediError::Validation(_))
        ));
    }

    #[test]
    fn click_index_is_not_bounds_checked() {
        let tx = builder().record_click(ObjectId::from_low_byte(1), 7).unwrap();
        let call = move_call(&tx.plan, 0);
        assert_eq!(call.function, "click_link");
        assert_eq!(tx.plan.inputs[1], PlannedInput::Pure(7u64.to_le_bytes().to_vec()));
    }

    #[test]
    fn donation_spends_the_gas_coin() {
        let tx = builder().donation(SuiAddress::from_low_byte(3), 5).unwrap();
        assert!(tx.plan.uses_gas_coin());
        assert!(tx.allowed_targets().is_empty());
        assert!(builder().donation(SuiAddress::from_low_byte(3), 0).is_err());
    }

    #[test]
    fn sui_amounts_truncate_to_mist() {
        assert_eq!(parse_sui_amount("1").unwrap(), MIST_PER_SUI);
        assert_eq!(parse_sui_amount("0.5").unwrap(), 500_000_000);
        assert_eq!(parse_sui_amount(".25").unwrap(), 250_000_000);
        assert_eq!(parse_sui_amount("0.0000000019").unwrap(), 1);
        assert!(parse_sui_amount("0").is_err());
        assert!(parse_sui_amount("-1").is_err());
        assert!(parse_sui_amount("1.2.3").is_err());
        assert!(parse_sui_amount("").is_err());
        assert!(parse_sui_amount("99999999999999999999").is_err());
    }
}

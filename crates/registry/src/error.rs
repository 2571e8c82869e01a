use lodestone_primitives::{Key, KeyError};

/// Error returned by bootstrap loaders. Any error type converts into it with `?`.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registry contract violations.
///
/// Everything except the `Duplicate*` variants indicates a bootstrap ordering
/// bug or a programming error; callers are expected to abort startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
	#[error("trying to access unbound holder {holder} from registry {registry}")]
	UnboundHolder { registry: Key, holder: String },

	#[error("registry {registry} is already frozen, cannot write {key}")]
	Frozen { registry: Key, key: String },

	#[error("cannot freeze registry {registry}: {}", freeze_summary(.unbound, *.leftover_intrusive))]
	Freeze {
		registry: Key,
		/// Locations of every standalone holder that was never bound.
		unbound: Vec<Key>,
		/// Intrusive holders created but never consumed by `register`.
		leftover_intrusive: usize,
	},

	#[error("key {key} does not belong to registry {registry}")]
	ForeignKey { registry: Key, key: String },

	#[error("cannot modify holder key in registry {registry}: existing {existing}, new {new}")]
	HolderKeyConflict { registry: Key, existing: Key, new: Key },

	#[error("cannot modify intrusive holder value for {key} in registry {registry}")]
	IntrusiveValueConflict { registry: Key, key: Key },

	#[error("no intrusive holder was created for the value registered as {key} in registry {registry}")]
	MissingIntrusiveHolder { registry: Key, key: Key },

	#[error("registry {registry} cannot create intrusive holders")]
	NotIntrusive { registry: Key },

	#[error("registry {registry} cannot create a holder for {key} without a value")]
	IntrusiveOnly { registry: Key, key: Key },

	#[error("duplicate key {key} in registry {registry}")]
	DuplicateKey { registry: Key, key: Key },

	#[error("duplicate value for {key} in registry {registry}, already registered as {existing}")]
	DuplicateValue { registry: Key, key: Key, existing: Key },

	#[error("duplicate id {id} for {key} in registry {registry}, already used by {existing}")]
	DuplicateId {
		registry: Key,
		id: u32,
		key: Key,
		existing: Key,
	},

	#[error("id mismatch for {key} in registry {registry}: provided {provided}, expected {expected}")]
	IdMismatch {
		registry: Key,
		key: Key,
		provided: u32,
		expected: u32,
	},

	#[error("id {id} for {key} in registry {registry} is out of range, ids must be below {max}")]
	IdOutOfRange { registry: Key, key: Key, id: u32, max: u32 },

	#[error("tag {tag} cannot contain {holder} from outside registry {registry}")]
	ForeignHolder { registry: Key, tag: Key, holder: String },

	#[error("tag {tag} in registry {registry} contains a direct holder")]
	DirectHolderInTag { registry: Key, tag: Key },

	#[error("default value {default} of registry {registry} has not been registered")]
	MissingDefault { registry: Key, default: Key },

	#[error("failed to bootstrap registry {registry}")]
	Bootstrap {
		registry: Key,
		#[source]
		source: LoaderError,
	},

	#[error("registry validation failed:\n{}", issue_list(.issues))]
	Validation { issues: Vec<ValidationIssue> },

	#[error(transparent)]
	Key(#[from] KeyError),
}

/// A problem found by the whole-graph validation pass after bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
	#[error("{registry}: holder {key} is unbound")]
	UnboundHolder { registry: Key, key: Key },
	#[error("{registry}: default value {default} was not loaded")]
	MissingDefault { registry: Key, default: Key },
	#[error("{registry}: tag {tag} contains an unbound holder")]
	UnboundTagMember { registry: Key, tag: Key },
	#[error("{registry}: tag {tag} contains a holder that is not registered here")]
	ForeignTagMember { registry: Key, tag: Key },
}

fn freeze_summary(unbound: &[Key], leftover_intrusive: usize) -> String {
	let mut parts = Vec::new();
	if !unbound.is_empty() {
		let keys: Vec<String> = unbound.iter().map(ToString::to_string).collect();
		parts.push(format!("unbound keys [{}]", keys.join(", ")));
	}
	if leftover_intrusive > 0 {
		parts.push(format!("{leftover_intrusive} unregistered intrusive holder(s)"));
	}
	parts.join("; ")
}

fn issue_list(issues: &[ValidationIssue]) -> String {
	issues
		.iter()
		.map(|issue| format!("  - {issue}"))
		.collect::<Vec<_>>()
		.join("\n")
}

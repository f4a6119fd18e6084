//! Hypermedia traversal of a Redfish service
//!
//! The traversal starts at the service root and discovers everything else by
//! following links found in the documents it fetches:
//!
//! ```text
//! service root -> Systems -> System -> Processors         -> Processor
//!                                   -> EthernetInterfaces -> NIC
//!                                   -> SimpleStorage      -> Controller -> Devices (disks)
//! ```
//!
//! Fetching is abstracted behind [`Fetch`], so the traversal itself performs
//! no I/O and can be driven by fixture documents. A failed fetch never aborts
//! the run: the branch that needed the document is logged and left empty. The
//! only condition that stops a run is a service root without a systems link.
//!
//! Sibling documents are fetched concurrently, at most [`MAX_IN_FLIGHT`] at a
//! time per collection, and folded back in the order the parent listed them, so
//! a later member with a colliding id still wins.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::attributes::AttributeFilter;
use crate::error::{ProbeError, Result};
use crate::links;
use crate::model::{Inventory, Record, SubsystemKind, System};

/// Path of the memory size field inside a System document.
pub const MEMORY_FIELD: &[&str] = &["MemorySummary", "TotalSystemMemoryGiB"];

/// Key holding the inline disk descriptors of a storage controller.
pub const DEVICES: &str = "Devices";

/// Members of one collection fetched concurrently. Controllers serve few
/// requests at a time.
pub const MAX_IN_FLIGHT: usize = 4;

/// Source of Redfish documents.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Fetch the document at `path`, absolute or relative to the service root.
    async fn fetch(&self, path: &str) -> Result<Value>;
}

impl<T: Fetch> Fetch for &T {
    async fn fetch(&self, path: &str) -> Result<Value> {
        (**self).fetch(path).await
    }
}

// ============================================================================
// Subsystem Builder
// ============================================================================

/// Fetch a collection and every member it lists.
///
/// Returns `(derived id, member document)` pairs in `Members` order. A failed
/// collection fetch yields nothing; a failed member fetch drops that member.
async fn fetch_members<F: Fetch>(
    fetcher: &F,
    link: &str,
    kind: SubsystemKind,
) -> Vec<(String, Value)> {
    let collection = match fetcher.fetch(link).await {
        Ok(collection) => collection,
        Err(err) => {
            log::warn!("Skipping {kind} collection: {err}");
            return Vec::new();
        }
    };

    let member_links = links::members(&collection);
    let documents: Vec<_> = stream::iter(member_links.iter().map(|member| fetcher.fetch(member)))
        .buffered(MAX_IN_FLIGHT)
        .collect()
        .await;

    member_links
        .into_iter()
        .zip(documents)
        .filter_map(|(member, document)| match document {
            Ok(document) => Some((links::derive_id(&member), document)),
            Err(err) => {
                log::warn!("Skipping {kind} {member}: {err}");
                None
            }
        })
        .collect()
}

/// Insert a record, the later one winning on a colliding id.
fn insert_record(records: &mut BTreeMap<String, Record>, id: String, record: Record) {
    let kind = record.kind;
    if records.insert(id.clone(), record).is_some() {
        log::warn!("Duplicate {kind} id {id}, keeping the later member");
    }
}

/// Build one record per member of the collection at `link`.
pub async fn build_collection<F: Fetch>(
    fetcher: &F,
    link: &str,
    kind: SubsystemKind,
) -> BTreeMap<String, Record> {
    let filter = kind.filter();
    let mut records = BTreeMap::new();

    for (id, document) in fetch_members(fetcher, link, kind).await {
        insert_record(&mut records, id, Record::new(kind, filter.extract(&document)));
    }

    records
}

/// Disks reported inline by a storage controller document.
///
/// Entries that are not JSON objects are skipped.
pub fn extract_disks(controller: &Value, filter: &AttributeFilter) -> Vec<Record> {
    controller
        .get(DEVICES)
        .and_then(Value::as_array)
        .map(|devices| {
            devices
                .iter()
                .filter(|device| device.is_object())
                .map(|device| Record::new(SubsystemKind::Disk, filter.extract(device)))
                .collect()
        })
        .unwrap_or_default()
}

/// Build the storage controllers at `link` along with the disks they report.
///
/// Disks are returned in controller order, then device order.
pub async fn build_storage<F: Fetch>(
    fetcher: &F,
    link: &str,
) -> (BTreeMap<String, Record>, Vec<Record>) {
    let kind = SubsystemKind::StorageController;
    let controller_filter = kind.filter();
    let disk_filter = SubsystemKind::Disk.filter();

    let mut controllers = BTreeMap::new();
    let mut disks = Vec::new();

    for (id, document) in fetch_members(fetcher, link, kind).await {
        disks.extend(extract_disks(&document, &disk_filter));
        insert_record(
            &mut controllers,
            id,
            Record::new(kind, controller_filter.extract(&document)),
        );
    }

    (controllers, disks)
}

// ============================================================================
// System Builder
// ============================================================================

/// Read the link to a subsystem collection, logging when it is absent.
fn category_link<'a>(
    system_id: &str,
    document: &'a Value,
    kind: SubsystemKind,
) -> Option<&'a str> {
    let key = kind.link_key()?;
    let link = links::link(document, key);
    if link.is_none() {
        let err = ProbeError::MissingLink {
            document: format!("System {system_id}"),
            key: key.to_string(),
        };
        log::warn!("{err}, no {kind} records");
    }
    link
}

/// Read the memory size, logging at error level when it is absent.
fn read_memory_gib(system_id: &str, document: &Value) -> Option<f64> {
    let memory = links::lookup(document, MEMORY_FIELD).and_then(Value::as_f64);
    if memory.is_none() {
        let err = ProbeError::MissingField {
            document: format!("System {system_id}"),
            field: MEMORY_FIELD.join("."),
        };
        log::error!("{err}");
    }
    memory
}

async fn build_category<F: Fetch>(
    fetcher: &F,
    system_id: &str,
    document: &Value,
    kind: SubsystemKind,
) -> BTreeMap<String, Record> {
    match category_link(system_id, document, kind) {
        Some(link) => build_collection(fetcher, link, kind).await,
        None => BTreeMap::new(),
    }
}

async fn build_storage_category<F: Fetch>(
    fetcher: &F,
    system_id: &str,
    document: &Value,
) -> (BTreeMap<String, Record>, Vec<Record>) {
    match category_link(system_id, document, SubsystemKind::StorageController) {
        Some(link) => build_storage(fetcher, link).await,
        None => (BTreeMap::new(), Vec::new()),
    }
}

/// Build a System from its document, following its subsystem links.
///
/// Each subsystem category is independent: a missing or unreachable category
/// leaves only that category empty.
pub async fn build_system<F: Fetch>(fetcher: &F, id: &str, document: &Value) -> System {
    let attributes = AttributeFilter::system().extract(document);
    let memory_gib = read_memory_gib(id, document);

    let (processors, network_interfaces, (storage_controllers, disks)) = futures::join!(
        build_category(fetcher, id, document, SubsystemKind::Processor),
        build_category(fetcher, id, document, SubsystemKind::NetworkInterface),
        build_storage_category(fetcher, id, document),
    );

    System {
        id: id.to_string(),
        attributes,
        memory_gib,
        processors,
        network_interfaces,
        storage_controllers,
        disks,
    }
}

// ============================================================================
// Explorer
// ============================================================================

/// Progress of an exploration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreState {
    NotStarted,
    RootFetched,
    SystemsLinkResolved,
    Done,
    /// The service root was unreachable or had no systems link.
    Aborted,
}

/// Walks a Redfish service and owns the resulting [`Inventory`].
pub struct Explorer<F> {
    fetcher: F,
    state: ExploreState,
    inventory: Inventory,
}

impl<F: Fetch> Explorer<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: ExploreState::NotStarted,
            inventory: Inventory::default(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn state(&self) -> ExploreState {
        self.state
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn into_inventory(self) -> Inventory {
        self.inventory
    }

    /// Run a fresh exploration, discarding the results of any previous run.
    ///
    /// Never fails. Returns the terminal state: [`ExploreState::Aborted`] when
    /// the service root could not be read or lacks a systems link, in which
    /// case the inventory stays empty.
    pub async fn explore(&mut self) -> ExploreState {
        self.inventory = Inventory::default();
        self.state = ExploreState::NotStarted;

        let root = match self.fetcher.fetch(links::SERVICE_ROOT).await {
            Ok(root) => root,
            Err(err) => {
                log::error!("Unable to read the service root: {err}");
                return self.finish(ExploreState::Aborted);
            }
        };
        self.state = ExploreState::RootFetched;

        self.inventory.api_version = root
            .get(links::REDFISH_VERSION)
            .and_then(Value::as_str)
            .map(str::to_string);
        match &self.inventory.api_version {
            Some(version) => log::info!("Service root advertises Redfish {version}"),
            None => log::debug!("Service root does not advertise a Redfish version"),
        }

        let Some(systems_link) = links::link(&root, links::SYSTEMS) else {
            let err = ProbeError::MissingLink {
                document: "Service root".to_string(),
                key: links::SYSTEMS.to_string(),
            };
            log::error!("{err}, nothing to explore");
            return self.finish(ExploreState::Aborted);
        };
        self.state = ExploreState::SystemsLinkResolved;

        let collection = match self.fetcher.fetch(systems_link).await {
            Ok(collection) => collection,
            Err(err) => {
                log::warn!("Unable to read the systems collection: {err}");
                return self.finish(ExploreState::Done);
            }
        };

        let fetcher = &self.fetcher;
        let members = links::members(&collection).into_iter().map(|link| async move {
            let id = links::derive_id(&link);
            match fetcher.fetch(&link).await {
                Ok(document) => {
                    log::debug!("Building System {id} from {link}");
                    Ok(build_system(fetcher, &id, &document).await)
                }
                Err(err) => {
                    log::warn!("Skipping System {id}: {err}");
                    Err(id)
                }
            }
        });
        let systems: Vec<_> = stream::iter(members).buffered(MAX_IN_FLIGHT).collect().await;

        for system in systems {
            match system {
                Ok(system) => {
                    let id = system.id.clone();
                    if self.inventory.systems.insert(id.clone(), system).is_some() {
                        log::warn!("Duplicate System id {id}, keeping the later member");
                    }
                }
                Err(id) => self.inventory.skipped.push(id),
            }
        }

        self.finish(ExploreState::Done)
    }

    fn finish(&mut self, state: ExploreState) -> ExploreState {
        self.state = state;
        state
    }
}

mod cables;
mod device_roles;
mod device_types;
mod devices;
pub mod error;
mod manufacturers;
mod rack_groups;
mod racks;
mod regions;
pub(crate) mod row_helpers;
mod seeds;
mod sites;
mod statuses;

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite, SqliteConnection, Transaction};

use crate::models::*;

pub use cables::CableRepo;
pub use device_roles::DeviceRoleRepo;
pub use device_types::{DeviceTypeRepo, InterfaceTemplateRepo};
pub use devices::{DeviceRepo, InterfaceRepo};
pub use error::StoreError;
pub use manufacturers::ManufacturerRepo;
pub use rack_groups::RackGroupRepo;
pub use racks::RackRepo;
pub use regions::RegionRepo;
pub use sites::SiteRepo;
pub use statuses::StatusRepo;

/// Tables holding generated records, in dependency order.
/// Statuses are reference data and are never cleared.
const GENERATED_TABLES: &[&str] = &[
    "regions",
    "sites",
    "manufacturers",
    "device_roles",
    "device_types",
    "interface_templates",
    "rack_groups",
    "racks",
    "devices",
    "interfaces",
    "cables",
];

/// Store owns the SQLite pool; repos run against a connection or transaction borrowed from it.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory store. A single connection that never expires, since
    /// every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations and seed reference data
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;

        self.seed_default_statuses().await
    }

    async fn seed_default_statuses(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for status in seeds::default_statuses() {
            if StatusRepo::get_by_slug(&mut tx, status.slug).await?.is_some() {
                continue;
            }
            StatusRepo::create(&mut tx, status.name, status.slug, status.color, status.content_types).await?;
            tracing::debug!("Seeded status {}", status.slug);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Start the transaction a generation run executes in
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.context("Failed to begin transaction")
    }

    /// Count records of every generated kind
    pub async fn counts(&self) -> Result<RecordCounts> {
        let mut conn = self.pool.acquire().await?;
        count_records(&mut conn).await
    }

    /// Delete every generated record, children first. Returns the counts that were removed.
    /// Deleting a cable releases its interfaces (`ON DELETE SET NULL`).
    pub async fn clear(&self) -> Result<RecordCounts> {
        let mut tx = self.pool.begin().await?;
        let removed = count_records(&mut tx).await?;
        for table in GENERATED_TABLES.iter().rev() {
            let result = sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to clear {}", table))?;
            tracing::debug!("Deleted {} rows from {}", result.rows_affected(), table);
        }
        tx.commit().await?;
        Ok(removed)
    }
}

/// Count records of every generated kind on an open connection or transaction
pub async fn count_records(conn: &mut SqliteConnection) -> Result<RecordCounts> {
    let mut counts = Vec::with_capacity(GENERATED_TABLES.len());
    for table in GENERATED_TABLES {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut *conn)
            .await?;
        counts.push(count);
    }

    Ok(RecordCounts {
        regions: counts[0],
        sites: counts[1],
        manufacturers: counts[2],
        device_roles: counts[3],
        device_types: counts[4],
        interface_templates: counts[5],
        rack_groups: counts[6],
        racks: counts[7],
        devices: counts[8],
        interfaces: counts[9],
        cables: counts[10],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        site: Site,
        other_site: Site,
        rack: Rack,
        role: DeviceRole,
        switch: DeviceType,
        active: Status,
    }

    async fn fixture(conn: &mut SqliteConnection) -> Fixture {
        let active = assert_ok!(StatusRepo::get_for_model(conn, model_label::DEVICE, status_slug::ACTIVE).await);
        let region = assert_ok!(RegionRepo::create(conn, &CreateRegionRequest { name: "USA".into(), parent_id: None }).await);
        let site = assert_ok!(
            SiteRepo::create(
                conn,
                &CreateSiteRequest { name: "Phoenix Datacenter".into(), region_id: Some(region.id), status_id: active.id },
            )
            .await
        );
        let other_site = assert_ok!(
            SiteRepo::create(
                conn,
                &CreateSiteRequest { name: "Seattle Office".into(), region_id: Some(region.id), status_id: active.id },
            )
            .await
        );
        let group = assert_ok!(
            RackGroupRepo::create(conn, &CreateRackGroupRequest { name: "PHX Row 1".into(), site_id: site.id, parent_id: None }).await
        );
        let rack = assert_ok!(
            RackRepo::create(
                conn,
                &CreateRackRequest {
                    name: "PHX 1-1".into(),
                    group_id: Some(group.id),
                    site_id: site.id,
                    status_id: active.id,
                    row_position: 1,
                },
            )
            .await
        );
        let role = assert_ok!(
            DeviceRoleRepo::create(conn, &CreateDeviceRoleRequest { name: "Top of rack switch".into(), vm_role: false }).await
        );
        let cisco = assert_ok!(ManufacturerRepo::create(conn, "Cisco").await);
        let switch = assert_ok!(
            DeviceTypeRepo::create(
                conn,
                &CreateDeviceTypeRequest { manufacturer_id: cisco.id, model: "Nexus 3232C".into(), u_height: 1, is_full_depth: true },
            )
            .await
        );
        for n in 1..=4 {
            assert_ok!(
                InterfaceTemplateRepo::create(conn, switch.id, &format!("Ethernet{}", n), interface_type::TYPE_100GE_QSFP28).await
            );
        }

        Fixture { site, other_site, rack, role, switch, active }
    }

    fn device_req(f: &Fixture, name: &str, position: i32) -> CreateDeviceRequest {
        CreateDeviceRequest {
            name: name.to_string(),
            device_role_id: f.role.id,
            device_type_id: f.switch.id,
            site_id: f.site.id,
            rack_id: Some(f.rack.id),
            position: Some(position),
            face: Some(RackFace::Front),
            status_id: f.active.id,
        }
    }

    fn store_error(err: &anyhow::Error) -> &StoreError {
        err.downcast_ref::<StoreError>().expect("expected a StoreError")
    }

    #[tokio::test]
    async fn test_default_statuses_seeded() {
        let store = assert_ok!(Store::in_memory().await);
        let mut conn = store.pool.acquire().await.unwrap();

        let statuses = assert_ok!(StatusRepo::list(&mut conn).await);
        assert_eq!(statuses.len(), 7);

        let connected = assert_ok!(StatusRepo::get_for_model(&mut conn, model_label::CABLE, status_slug::CONNECTED).await);
        assert_eq!(connected.content_types, vec![model_label::CABLE.to_string()]);

        let err = assert_err!(StatusRepo::get_for_model(&mut conn, model_label::CABLE, status_slug::ACTIVE).await);
        assert!(matches!(store_error(&err), StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_lookups_by_attribute() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        let f = fixture(&mut tx).await;

        let usa = assert_ok!(RegionRepo::get_by_name(&mut tx, "USA").await);
        assert_eq!(assert_ok!(RegionRepo::list(&mut tx).await).len(), 1);
        assert!(assert_ok!(RegionRepo::list_children(&mut tx, usa.id).await).is_empty());
        assert_eq!(assert_ok!(SiteRepo::get_by_slug(&mut tx, "phoenix-datacenter").await).id, f.site.id);
        assert_eq!(assert_ok!(SiteRepo::get_by_name(&mut tx, "Seattle Office").await).id, f.other_site.id);
        assert_eq!(assert_ok!(ManufacturerRepo::get_by_name(&mut tx, "Cisco").await).slug, "cisco");
        assert_eq!(assert_ok!(DeviceRoleRepo::get_by_slug(&mut tx, "top-of-rack-switch").await).id, f.role.id);
        assert_eq!(assert_ok!(DeviceTypeRepo::get_by_model(&mut tx, "Nexus 3232C").await).slug, "nexus-3232c");
        assert_eq!(assert_ok!(DeviceTypeRepo::get_by_slug(&mut tx, "nexus-3232c").await).id, f.switch.id);
        assert_eq!(assert_ok!(InterfaceTemplateRepo::list_for_type(&mut tx, f.switch.id).await).len(), 4);
        assert_eq!(assert_ok!(RackGroupRepo::get_by_name(&mut tx, f.site.id, "PHX Row 1").await).slug, "phx-row-1");
        assert_eq!(assert_ok!(RackRepo::get_by_name(&mut tx, f.site.id, "PHX 1-1").await).id, f.rack.id);

        let err = assert_err!(RegionRepo::get_by_name(&mut tx, "Atlantis").await);
        assert!(matches!(store_error(&err), StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_by_id_and_hierarchy() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        let f = fixture(&mut tx).await;

        let region_id = f.site.region_id.unwrap();
        assert_eq!(assert_ok!(RegionRepo::get(&mut tx, region_id).await).unwrap().name, "USA");
        assert_eq!(assert_ok!(SiteRepo::get(&mut tx, f.site.id).await).unwrap().slug, "phoenix-datacenter");
        assert_eq!(assert_ok!(ManufacturerRepo::get(&mut tx, f.switch.manufacturer_id).await).unwrap().name, "Cisco");
        assert_eq!(assert_ok!(DeviceRoleRepo::get(&mut tx, f.role.id).await).unwrap().slug, "top-of-rack-switch");
        assert!(assert_ok!(SiteRepo::get(&mut tx, 9999).await).is_none());

        let row = f.rack.group_id.unwrap();
        let all = assert_ok!(
            RackGroupRepo::create(&mut tx, &CreateRackGroupRequest { name: "PHX (ALL)".into(), site_id: f.site.id, parent_id: None }).await
        );
        let row2 = assert_ok!(
            RackGroupRepo::create(
                &mut tx,
                &CreateRackGroupRequest { name: "PHX Row 2".into(), site_id: f.site.id, parent_id: Some(all.id) },
            )
            .await
        );
        let children = assert_ok!(RackGroupRepo::list_children(&mut tx, all.id).await);
        assert_eq!(children.iter().map(|g| g.id).collect::<Vec<_>>(), vec![row2.id]);

        let racks = assert_ok!(RackRepo::list_for_group(&mut tx, row).await);
        assert_eq!(racks.len(), 1);
        assert_eq!(racks[0].u_height, RACK_U_HEIGHT);
        assert!(assert_ok!(RackRepo::list_for_group(&mut tx, row2.id).await).is_empty());

        let err = assert_err!(
            RackGroupRepo::create(
                &mut tx,
                &CreateRackGroupRequest { name: "SEA Row 1".into(), site_id: f.other_site.id, parent_id: Some(all.id) },
            )
            .await
        );
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }));
    }

    #[tokio::test]
    async fn test_get_by_model_reports_multiple_matches() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        for name in ["Cisco", "Arista"] {
            let m = assert_ok!(ManufacturerRepo::create(&mut tx, name).await);
            assert_ok!(
                DeviceTypeRepo::create(
                    &mut tx,
                    &CreateDeviceTypeRequest { manufacturer_id: m.id, model: "Switch".into(), u_height: 1, is_full_depth: true },
                )
                .await
            );
        }

        let err = assert_err!(DeviceTypeRepo::get_by_model(&mut tx, "Switch").await);
        assert!(matches!(store_error(&err), StoreError::MultipleMatches { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_classified() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        assert_ok!(ManufacturerRepo::create(&mut tx, "Cisco").await);

        let err = assert_err!(ManufacturerRepo::create(&mut tx, "Cisco").await);
        assert!(matches!(store_error(&err), StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_region_with_missing_parent_is_constraint() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();

        let err = assert_err!(RegionRepo::create(&mut tx, &CreateRegionRequest { name: "Orphan".into(), parent_id: Some(999) }).await);
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }));
    }

    #[tokio::test]
    async fn test_device_gets_interfaces_from_templates() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        let f = fixture(&mut tx).await;

        let device = assert_ok!(DeviceRepo::create(&mut tx, &device_req(&f, "phx-leaf1-1-1", 41)).await);
        let interfaces = assert_ok!(InterfaceRepo::list_for_device(&mut tx, device.id).await);
        let names: Vec<&str> = interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Ethernet1", "Ethernet2", "Ethernet3", "Ethernet4"]);
        assert!(interfaces.iter().all(|i| i.cable_id.is_none()));

        let found = assert_ok!(DeviceRepo::get_by_name(&mut tx, f.site.id, "phx-leaf1-1-1").await);
        assert_eq!(found.face, Some(RackFace::Front));
        assert_eq!(found.position, Some(41));
    }

    #[tokio::test]
    async fn test_device_rack_must_share_site() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        let f = fixture(&mut tx).await;

        let mut req = device_req(&f, "sea-sw1", 10);
        req.site_id = f.other_site.id;
        let err = assert_err!(DeviceRepo::create(&mut tx, &req).await);
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }));
    }

    #[tokio::test]
    async fn test_device_placement_collisions() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        let f = fixture(&mut tx).await;

        assert_ok!(DeviceRepo::create(&mut tx, &device_req(&f, "a", 40)).await);
        assert_ok!(DeviceRepo::create(&mut tx, &device_req(&f, "b", 41)).await);

        let err = assert_err!(DeviceRepo::create(&mut tx, &device_req(&f, "c", 40)).await);
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }));

        let mut rear = device_req(&f, "d", 41);
        rear.face = Some(RackFace::Rear);
        let err = assert_err!(DeviceRepo::create(&mut tx, &rear).await);
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }), "full depth occupies both faces");

        let err = assert_err!(DeviceRepo::create(&mut tx, &device_req(&f, "e", 43)).await);
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }));
    }

    #[tokio::test]
    async fn test_cable_constraints() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        let f = fixture(&mut tx).await;
        let connected = assert_ok!(StatusRepo::get_for_model(&mut tx, model_label::CABLE, status_slug::CONNECTED).await);

        let a = assert_ok!(DeviceRepo::create(&mut tx, &device_req(&f, "a", 40)).await);
        let b = assert_ok!(DeviceRepo::create(&mut tx, &device_req(&f, "b", 41)).await);
        let a1 = assert_ok!(InterfaceRepo::get_by_name(&mut tx, a.id, "Ethernet1").await);
        let b1 = assert_ok!(InterfaceRepo::get_by_name(&mut tx, b.id, "Ethernet1").await);
        let b2 = assert_ok!(InterfaceRepo::get_by_name(&mut tx, b.id, "Ethernet2").await);

        let cable = assert_ok!(
            CableRepo::create(
                &mut tx,
                &CreateCableRequest { termination_a_id: a1.id, termination_b_id: b1.id, status_id: connected.id },
            )
            .await
        );
        let a1 = assert_ok!(InterfaceRepo::get(&mut tx, a1.id).await).unwrap();
        assert_eq!(a1.cable_id, Some(cable.id));

        let err = assert_err!(
            CableRepo::create(
                &mut tx,
                &CreateCableRequest { termination_a_id: b2.id, termination_b_id: a1.id, status_id: connected.id },
            )
            .await
        );
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }));

        let err = assert_err!(
            CableRepo::create(
                &mut tx,
                &CreateCableRequest { termination_a_id: b2.id, termination_b_id: b2.id, status_id: connected.id },
            )
            .await
        );
        assert!(matches!(store_error(&err), StoreError::Constraint { .. }));

        let err = assert_err!(
            CableRepo::create(
                &mut tx,
                &CreateCableRequest { termination_a_id: b2.id, termination_b_id: 9999, status_id: connected.id },
            )
            .await
        );
        assert!(matches!(store_error(&err), StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_clear_removes_generated_records_only() {
        use crate::generate::plan::DatacenterPlan;
        use crate::generate::{generate, TopologyPlan};

        let plan = TopologyPlan {
            datacenters: vec![DatacenterPlan { code: "PHX".to_string(), site: "Phoenix Datacenter".to_string() }],
            rows: 2,
            racks_per_row: 2,
            ..TopologyPlan::default()
        };
        let store = assert_ok!(Store::in_memory().await);
        {
            let mut tx = store.begin().await.unwrap();
            assert_ok!(generate(&mut tx, &plan).await);
            tx.commit().await.unwrap();
        }

        let removed = assert_ok!(store.clear().await);
        assert_eq!(removed.regions, 18);
        assert_eq!(removed.rack_groups, 3);
        assert_eq!(removed.devices, 10);
        assert_eq!(removed.cables, 16);
        assert_eq!(assert_ok!(store.counts().await), RecordCounts::default());

        let mut conn = store.pool.acquire().await.unwrap();
        assert_eq!(assert_ok!(StatusRepo::list(&mut conn).await).len(), 7);
        drop(conn);

        // Same names can be generated again once cleared
        let mut tx = store.begin().await.unwrap();
        assert_ok!(generate(&mut tx, &plan).await);
        assert_eq!(assert_ok!(count_records(&mut tx).await), removed);
    }
}

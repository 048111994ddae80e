use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api_client::ApiClient;
use crate::errors::AppError;
use crate::models::{Branch, EntityId, Sector, Specialization};

/// Where the sector/branch/specialization lists come from.
#[async_trait]
pub trait HierarchySource: Send + Sync {
    async fn sectors(&self) -> Result<Vec<Sector>, AppError>;

    async fn branches(&self, sector_id: &EntityId) -> Result<Vec<Branch>, AppError>;

    async fn specializations(&self, branch_id: &EntityId) -> Result<Vec<Specialization>, AppError>;
}

#[async_trait]
impl HierarchySource for ApiClient {
    async fn sectors(&self) -> Result<Vec<Sector>, AppError> {
        Ok(ApiClient::sectors(self).await?)
    }

    async fn branches(&self, sector_id: &EntityId) -> Result<Vec<Branch>, AppError> {
        Ok(ApiClient::branches(self, sector_id).await?)
    }

    async fn specializations(&self, branch_id: &EntityId) -> Result<Vec<Specialization>, AppError> {
        Ok(ApiClient::specializations(self, branch_id).await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Branches,
    Specializations,
}

/// Issued when a selection triggers a child fetch. The result is only applied if
/// the ticket is still current when it comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    level: Level,
    generation: u64,
    parent: EntityId,
}

impl FetchTicket {
    pub fn parent(&self) -> &EntityId {
        &self.parent
    }
}

/// A completed selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingChoice {
    pub sector_id: EntityId,
    pub branch_id: EntityId,
    pub specialization_id: EntityId,
}

/// Three dependent selections. Changing a parent always empties everything below it.
#[derive(Debug, Default)]
pub struct Cascade {
    sectors: Vec<Sector>,
    branches: Vec<Branch>,
    specializations: Vec<Specialization>,
    sector: Option<EntityId>,
    branch: Option<EntityId>,
    specialization: Option<EntityId>,
    generation: u64,
    closed: bool,
    message: Option<String>,
}

impl Cascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_sectors(&mut self, source: &dyn HierarchySource) {
        let result = source.sectors().await;
        self.apply_sectors(result);
    }

    pub fn apply_sectors(&mut self, result: Result<Vec<Sector>, AppError>) {
        if self.closed {
            return;
        }
        match result {
            Ok(sectors) => {
                self.sectors = sectors;
                self.message = None;
            }
            Err(e) => {
                warn!("Loading sectors failed: {e}");
                self.sectors.clear();
                self.message = Some(e.user_message());
            }
        }
    }

    /// Selects a sector, dropping the branch and specialization selections and lists.
    pub fn select_sector(&mut self, sector_id: EntityId) -> Result<FetchTicket, AppError> {
        if !self.sectors.iter().any(|s| s.id == sector_id) {
            return Err(AppError::Validation(format!("Unknown sector {sector_id}")));
        }
        self.generation += 1;
        self.sector = Some(sector_id.clone());
        self.branch = None;
        self.specialization = None;
        self.branches.clear();
        self.specializations.clear();
        self.message = None;
        Ok(FetchTicket {
            level: Level::Branches,
            generation: self.generation,
            parent: sector_id,
        })
    }

    /// Applies a branch list. Returns false if the ticket went stale or the cascade was closed.
    pub fn apply_branches(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Branch>, AppError>,
    ) -> bool {
        if !self.is_current(ticket, Level::Branches) {
            return false;
        }
        match result {
            Ok(branches) => {
                // A branch listed under another sector would break the hierarchy.
                self.branches = branches
                    .into_iter()
                    .filter(|b| b.sector_id.as_ref().map_or(true, |s| s == &ticket.parent))
                    .collect();
            }
            Err(e) => {
                warn!("Loading branches for sector {} failed: {e}", ticket.parent);
                self.message = Some(e.user_message());
            }
        }
        true
    }

    pub fn select_branch(&mut self, branch_id: EntityId) -> Result<FetchTicket, AppError> {
        if !self.branches.iter().any(|b| b.id == branch_id) {
            return Err(AppError::Validation(format!("Unknown branch {branch_id}")));
        }
        self.generation += 1;
        self.branch = Some(branch_id.clone());
        self.specialization = None;
        self.specializations.clear();
        self.message = None;
        Ok(FetchTicket {
            level: Level::Specializations,
            generation: self.generation,
            parent: branch_id,
        })
    }

    pub fn apply_specializations(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Specialization>, AppError>,
    ) -> bool {
        if !self.is_current(ticket, Level::Specializations) {
            return false;
        }
        match result {
            Ok(specializations) => {
                self.specializations = specializations
                    .into_iter()
                    .filter(|s| s.branch_id.as_ref().map_or(true, |b| b == &ticket.parent))
                    .collect();
            }
            Err(e) => {
                warn!("Loading specializations for branch {} failed: {e}", ticket.parent);
                self.message = Some(e.user_message());
            }
        }
        true
    }

    /// Select a sector and load its branches in one step.
    pub async fn choose_sector(
        &mut self,
        sector_id: EntityId,
        source: &dyn HierarchySource,
    ) -> Result<(), AppError> {
        let ticket = self.select_sector(sector_id)?;
        let result = source.branches(ticket.parent()).await;
        self.apply_branches(&ticket, result);
        Ok(())
    }

    pub async fn choose_branch(
        &mut self,
        branch_id: EntityId,
        source: &dyn HierarchySource,
    ) -> Result<(), AppError> {
        let ticket = self.select_branch(branch_id)?;
        let result = source.specializations(ticket.parent()).await;
        self.apply_specializations(&ticket, result);
        Ok(())
    }

    pub fn select_specialization(&mut self, specialization_id: EntityId) -> Result<(), AppError> {
        if !self.specializations.iter().any(|s| s.id == specialization_id) {
            return Err(AppError::Validation(format!(
                "Unknown specialization {specialization_id}"
            )));
        }
        self.specialization = Some(specialization_id);
        Ok(())
    }

    /// Stops accepting fetch results.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn complete(&self) -> Result<OnboardingChoice, AppError> {
        let (Some(branch_id), Some(specialization_id)) = (&self.branch, &self.specialization) else {
            return Err(AppError::Validation(
                "Please select a specialization".to_string(),
            ));
        };
        // The effective sector is the branch's own sector.
        let sector_id = self
            .branches
            .iter()
            .find(|b| &b.id == branch_id)
            .and_then(|b| b.sector_id.clone())
            .or_else(|| self.sector.clone())
            .ok_or_else(|| AppError::Validation("Please select a sector".to_string()))?;
        Ok(OnboardingChoice {
            sector_id,
            branch_id: branch_id.clone(),
            specialization_id: specialization_id.clone(),
        })
    }

    fn is_current(&self, ticket: &FetchTicket, level: Level) -> bool {
        if self.closed {
            debug!("Dropping {level:?} result for {}: cascade closed", ticket.parent);
            return false;
        }
        if ticket.level != level || ticket.generation != self.generation {
            debug!("Dropping stale {level:?} result for {}", ticket.parent);
            return false;
        }
        true
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn specializations(&self) -> &[Specialization] {
        &self.specializations
    }

    pub fn selected_sector(&self) -> Option<&EntityId> {
        self.sector.as_ref()
    }

    pub fn selected_branch(&self) -> Option<&EntityId> {
        self.branch.as_ref()
    }

    pub fn selected_specialization(&self) -> Option<&EntityId> {
        self.specialization.as_ref()
    }

    /// Last fetch failure, shown next to the affected list.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHierarchy {
        fail_branches: bool,
    }

    fn sector(id: i64, name: &str) -> Sector {
        Sector {
            id: id.into(),
            name: name.to_string(),
            description: None,
        }
    }

    fn branch(id: i64, sector_id: i64) -> Branch {
        Branch {
            id: id.into(),
            name: format!("Branch {id}"),
            description: None,
            sector_id: Some(sector_id.into()),
        }
    }

    fn specialization(id: i64, branch_id: i64) -> Specialization {
        Specialization {
            id: id.into(),
            name: format!("Specialization {id}"),
            description: None,
            branch_id: Some(branch_id.into()),
        }
    }

    #[async_trait]
    impl HierarchySource for FakeHierarchy {
        async fn sectors(&self) -> Result<Vec<Sector>, AppError> {
            Ok(vec![sector(1, "Technology"), sector(2, "Healthcare")])
        }

        async fn branches(&self, sector_id: &EntityId) -> Result<Vec<Branch>, AppError> {
            if self.fail_branches {
                return Err(AppError::Connectivity("connection refused".to_string()));
            }
            Ok(match sector_id.as_number() {
                Some(1) => vec![branch(10, 1), branch(11, 1)],
                Some(2) => vec![branch(20, 2)],
                _ => Vec::new(),
            })
        }

        async fn specializations(
            &self,
            branch_id: &EntityId,
        ) -> Result<Vec<Specialization>, AppError> {
            Ok(match branch_id.as_number() {
                Some(10) => vec![specialization(100, 10), specialization(101, 10)],
                Some(11) => vec![specialization(110, 11)],
                Some(20) => vec![specialization(200, 20)],
                _ => Vec::new(),
            })
        }
    }

    const SOURCE: FakeHierarchy = FakeHierarchy {
        fail_branches: false,
    };

    async fn loaded() -> Cascade {
        let mut cascade = Cascade::new();
        cascade.load_sectors(&SOURCE).await;
        cascade
    }

    #[tokio::test]
    async fn test_full_selection_completes() {
        let mut cascade = loaded().await;
        cascade.choose_sector(EntityId::from(1), &SOURCE).await.unwrap();
        assert_eq!(cascade.branches().len(), 2);
        cascade.choose_branch(EntityId::from(10), &SOURCE).await.unwrap();
        cascade.select_specialization(EntityId::from(101)).unwrap();

        let choice = cascade.complete().unwrap();
        assert_eq!(
            choice,
            OnboardingChoice {
                sector_id: EntityId::from(1),
                branch_id: EntityId::from(10),
                specialization_id: EntityId::from(101),
            }
        );
    }

    #[tokio::test]
    async fn test_new_sector_clears_everything_below() {
        let mut cascade = loaded().await;
        cascade.choose_sector(EntityId::from(1), &SOURCE).await.unwrap();
        cascade.choose_branch(EntityId::from(10), &SOURCE).await.unwrap();
        cascade.select_specialization(EntityId::from(100)).unwrap();

        let ticket = cascade.select_sector(EntityId::from(2)).unwrap();
        assert_eq!(cascade.selected_branch(), None);
        assert_eq!(cascade.selected_specialization(), None);
        assert!(cascade.branches().is_empty());
        assert!(cascade.specializations().is_empty());

        cascade.apply_branches(&ticket, Ok(vec![branch(20, 2)]));
        assert!(cascade.specializations().is_empty());
        assert!(cascade.complete().is_err());
    }

    #[tokio::test]
    async fn test_new_branch_clears_specialization() {
        let mut cascade = loaded().await;
        cascade.choose_sector(EntityId::from(1), &SOURCE).await.unwrap();
        cascade.choose_branch(EntityId::from(10), &SOURCE).await.unwrap();
        cascade.select_specialization(EntityId::from(100)).unwrap();

        cascade.choose_branch(EntityId::from(11), &SOURCE).await.unwrap();
        assert_eq!(cascade.selected_specialization(), None);
        let ids: Vec<_> = cascade.specializations().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![EntityId::from(110)]);
    }

    #[tokio::test]
    async fn test_stale_branch_result_is_dropped() {
        let mut cascade = loaded().await;
        let first = cascade.select_sector(EntityId::from(1)).unwrap();
        let second = cascade.select_sector(EntityId::from(2)).unwrap();

        assert!(!cascade.apply_branches(&first, Ok(vec![branch(10, 1)])));
        assert!(cascade.branches().is_empty());

        assert!(cascade.apply_branches(&second, Ok(vec![branch(20, 2)])));
        assert_eq!(cascade.branches()[0].id, EntityId::from(20));
    }

    #[tokio::test]
    async fn test_ticket_for_other_level_is_rejected() {
        let mut cascade = loaded().await;
        let ticket = cascade.select_sector(EntityId::from(1)).unwrap();
        assert!(!cascade.apply_specializations(&ticket, Ok(vec![specialization(100, 10)])));
        assert!(cascade.specializations().is_empty());
    }

    #[tokio::test]
    async fn test_results_after_close_are_dropped() {
        let mut cascade = loaded().await;
        let ticket = cascade.select_sector(EntityId::from(1)).unwrap();
        cascade.close();
        assert!(!cascade.apply_branches(&ticket, Ok(vec![branch(10, 1)])));
        assert!(cascade.branches().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_branches_are_filtered_out() {
        let mut cascade = loaded().await;
        let ticket = cascade.select_sector(EntityId::from(1)).unwrap();
        cascade.apply_branches(&ticket, Ok(vec![branch(10, 1), branch(20, 2)]));
        assert_eq!(cascade.branches().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_without_specialization_is_validation_error() {
        let mut cascade = loaded().await;
        cascade.choose_sector(EntityId::from(1), &SOURCE).await.unwrap();
        cascade.choose_branch(EntityId::from(10), &SOURCE).await.unwrap();
        let err = cascade.complete().unwrap_err();
        assert!(
            matches!(err, AppError::Validation(ref msg) if msg == "Please select a specialization")
        );
    }

    #[tokio::test]
    async fn test_unknown_selections_are_rejected() {
        let mut cascade = loaded().await;
        assert!(cascade.select_sector(EntityId::from(9)).is_err());
        assert_eq!(cascade.selected_sector(), None);
        cascade.choose_sector(EntityId::from(1), &SOURCE).await.unwrap();
        assert!(cascade.select_branch(EntityId::from(20)).is_err());
        assert!(cascade.select_specialization(EntityId::from(100)).is_err());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cascade_usable() {
        let failing = FakeHierarchy {
            fail_branches: true,
        };
        let mut cascade = Cascade::new();
        cascade.load_sectors(&failing).await;
        cascade.choose_sector(EntityId::from(1), &failing).await.unwrap();
        assert!(cascade.branches().is_empty());
        assert!(cascade.message().is_some());

        cascade.choose_sector(EntityId::from(2), &SOURCE).await.unwrap();
        assert_eq!(cascade.message(), None);
        assert_eq!(cascade.branches().len(), 1);
    }
}

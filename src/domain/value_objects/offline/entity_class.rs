use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One local collection per entity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    WorkOrder,
    WorkOrderDraft,
    MaterialEquipment,
    Survey,
    SurveyImage,
    ExecutionImage,
    ExecutionAttachment,
}

impl EntityClass {
    /// Replay order for a full sync: files first, then the entities whose
    /// payloads may reference them, then entities that hang off work orders.
    pub const SYNC_ORDER: [EntityClass; 7] = [
        EntityClass::SurveyImage,
        EntityClass::ExecutionImage,
        EntityClass::ExecutionAttachment,
        EntityClass::WorkOrderDraft,
        EntityClass::WorkOrder,
        EntityClass::MaterialEquipment,
        EntityClass::Survey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::WorkOrder => "work_order",
            EntityClass::WorkOrderDraft => "work_order_draft",
            EntityClass::MaterialEquipment => "material_equipment",
            EntityClass::Survey => "survey",
            EntityClass::SurveyImage => "survey_image",
            EntityClass::ExecutionImage => "execution_image",
            EntityClass::ExecutionAttachment => "execution_attachment",
        }
    }

    /// Name of the local collection (table) backing this class.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityClass::WorkOrder => "work_orders",
            EntityClass::WorkOrderDraft => "work_order_drafts",
            EntityClass::MaterialEquipment => "material_equipment",
            EntityClass::Survey => "surveys",
            EntityClass::SurveyImage => "survey_images",
            EntityClass::ExecutionImage => "execution_images",
            EntityClass::ExecutionAttachment => "execution_attachments",
        }
    }

    /// Path segment of the remote resource.
    pub fn resource(&self) -> &'static str {
        match self {
            EntityClass::WorkOrder => "work-orders",
            EntityClass::WorkOrderDraft => "work-orders/drafts",
            EntityClass::MaterialEquipment => "material-equipment",
            EntityClass::Survey => "surveys",
            EntityClass::SurveyImage => "survey-images",
            EntityClass::ExecutionImage => "execution-images",
            EntityClass::ExecutionAttachment => "execution-attachments",
        }
    }

    /// Classes whose records carry file content instead of an entity snapshot.
    pub fn is_attachment(&self) -> bool {
        matches!(
            self,
            EntityClass::SurveyImage | EntityClass::ExecutionImage | EntityClass::ExecutionAttachment
        )
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityClass {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::SYNC_ORDER
            .into_iter()
            .find(|class| class.as_str() == value || class.collection() == value)
            .ok_or_else(|| format!("Unknown entity class: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_order_puts_files_before_owners() {
        let position = |class: EntityClass| {
            EntityClass::SYNC_ORDER
                .iter()
                .position(|c| *c == class)
                .unwrap()
        };
        assert!(position(EntityClass::ExecutionImage) < position(EntityClass::WorkOrder));
        assert!(position(EntityClass::ExecutionAttachment) < position(EntityClass::WorkOrder));
        assert!(position(EntityClass::SurveyImage) < position(EntityClass::Survey));
        assert!(position(EntityClass::WorkOrder) < position(EntityClass::MaterialEquipment));
    }

    #[test]
    fn parses_both_class_and_collection_names() {
        assert_eq!("survey".parse::<EntityClass>(), Ok(EntityClass::Survey));
        assert_eq!("surveys".parse::<EntityClass>(), Ok(EntityClass::Survey));
        assert!("invoices".parse::<EntityClass>().is_err());
    }
}

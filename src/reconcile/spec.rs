use crate::core::RecordId;

/// Caller-supplied description of one desired child.
///
/// `id` present means "update this existing child", absent means "create".
/// `order` is only a hint for the final renumbering.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSpec<P> {
    pub id: Option<RecordId>,
    pub order: Option<i32>,
    pub reference: Option<RecordId>,
    pub payload: P,
}

impl<P> ChildSpec<P> {
    pub fn new(payload: P) -> Self {
        Self {
            id: None,
            order: None,
            reference: None,
            payload,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_reference(mut self, reference: RecordId) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

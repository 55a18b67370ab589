use crate::meta::RequestMeta;

/// The capability-check seam. The engine asks one yes/no question per
/// root field; policy lives entirely behind this trait.
pub trait PermissionCheck {
    fn allows(&self, meta: Option<&RequestMeta>, type_name: &str, field: &str) -> bool;
}

/// The default policy for deployments without field-level permissions.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl PermissionCheck for AllowAll {
    fn allows(&self, _meta: Option<&RequestMeta>, _type_name: &str, _field: &str) -> bool {
        true
    }
}

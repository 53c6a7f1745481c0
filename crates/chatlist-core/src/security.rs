use crate::domain::UserId;

// ============== Authorization ==============

pub fn is_authorized(user_id: Option<UserId>, allowed_users: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if allowed_users.is_empty() {
        return false;
    }
    allowed_users.contains(&user_id.0)
}

/// Static admin allow-list sourced from `ADMIN_IDS`.
#[derive(Clone, Debug, Default)]
pub struct AdminAllowList {
    ids: Vec<i64>,
}

impl AdminAllowList {
    pub fn new(ids: Vec<i64>) -> Self {
        Self { ids }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        is_authorized(Some(user_id), &self.ids)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_user_is_never_authorized() {
        assert!(!is_authorized(None, &[1, 2]));
    }

    #[test]
    fn empty_allow_list_denies_everyone() {
        let admins = AdminAllowList::new(vec![]);
        assert!(!admins.is_admin(UserId(1)));
        assert!(admins.is_empty());
    }

    #[test]
    fn listed_ids_are_admins() {
        let admins = AdminAllowList::new(vec![10, 20]);
        assert!(admins.is_admin(UserId(20)));
        assert!(!admins.is_admin(UserId(30)));
        assert_eq!(admins.len(), 2);
    }
}

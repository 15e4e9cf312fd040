//! Access decisions for authentication attempts and list administration.
//!
//! Transport-agnostic. `AccessService` composes the login, password and
//! address limiters with the allow and deny lists into one verdict.
//!
//! List mutations are check-then-act: the membership check and the write
//! are two separate store calls with no lock around them. Two concurrent
//! adds of the same subnet can both pass the check; the store's own
//! uniqueness rule decides which one wins, and the loser still reports
//! `AlreadyExists` (likewise `NotFound` for removals).

use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;

use crate::error::ServiceError;
use crate::limiter::RateLimiter;
use crate::subnet::{ListKind, SubnetStore, canonical};

/// The rule that decided a verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Address is on the allow-list; limits and deny-list are bypassed.
    AllowListed,
    /// Address is on neither list and every limiter admitted the attempt.
    Passed,
    /// Address is on the deny-list and not on the allow-list.
    DenyListed,
    /// Address is on neither list and at least one limiter refused.
    RateLimited,
}

/// Per-dimension limiter outcomes for one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitOutcome {
    pub login: bool,
    pub password: bool,
    pub address: bool,
}

impl LimitOutcome {
    pub fn all_passed(self) -> bool {
        self.login && self.password && self.address
    }
}

impl Decision {
    /// Applies list precedence: deny unless allow-listed, then allow-list,
    /// then the conjunction of the three limiters.
    pub fn resolve(limits: LimitOutcome, in_allow_list: bool, in_deny_list: bool) -> Self {
        if in_deny_list && !in_allow_list {
            Self::DenyListed
        } else if in_allow_list {
            Self::AllowListed
        } else if limits.all_passed() {
            Self::Passed
        } else {
            Self::RateLimited
        }
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, Self::AllowListed | Self::Passed)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AllowListed => "allow_listed",
            Self::Passed => "passed",
            Self::DenyListed => "deny_listed",
            Self::RateLimited => "rate_limited",
        }
    }
}

/// Decision engine owning the three limiters and borrowing both lists.
pub struct AccessService {
    login: Box<dyn RateLimiter>,
    password: Box<dyn RateLimiter>,
    address: Box<dyn RateLimiter>,
    allow_list: Arc<dyn SubnetStore>,
    deny_list: Arc<dyn SubnetStore>,
}

impl AccessService {
    pub fn new(
        login: impl RateLimiter + 'static,
        password: impl RateLimiter + 'static,
        address: impl RateLimiter + 'static,
        allow_list: Arc<dyn SubnetStore>,
        deny_list: Arc<dyn SubnetStore>,
    ) -> Self {
        Self {
            login: Box::new(login),
            password: Box::new(password),
            address: Box::new(address),
            allow_list,
            deny_list,
        }
    }

    /// Decides one authentication attempt.
    ///
    /// Every limiter sees the attempt, even when an earlier one already
    /// refused it or the address is listed. Store failures propagate.
    /// IPv4-mapped IPv6 addresses are judged as the IPv4 address.
    pub async fn decide(
        &self,
        login: &str,
        password: &str,
        addr: IpAddr,
    ) -> Result<Decision, ServiceError> {
        let addr = addr.to_canonical();
        let limits = LimitOutcome {
            login: self.login.allow(login),
            password: self.password.allow(password),
            address: self.address.allow(&addr.to_string()),
        };

        let (in_deny_list, in_allow_list) =
            tokio::try_join!(self.deny_list.has_ip(addr), self.allow_list.has_ip(addr))?;

        let decision = Decision::resolve(limits, in_allow_list, in_deny_list);
        tracing::debug!(
            login,
            %addr,
            login_ok = limits.login,
            password_ok = limits.password,
            address_ok = limits.address,
            in_allow_list,
            in_deny_list,
            decision = decision.label(),
            "verified attempt"
        );
        Ok(decision)
    }

    /// Returns whether the attempt may proceed.
    pub async fn verify(
        &self,
        login: &str,
        password: &str,
        addr: IpAddr,
    ) -> Result<bool, ServiceError> {
        Ok(self.decide(login, password, addr).await?.is_allowed())
    }

    /// Clears the login and address buckets. Always succeeds.
    pub fn reset(&self, login: &str, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.login.reset(login);
        self.address.reset(&addr.to_string());
        tracing::info!(login, %addr, "reset login and address buckets");
        true
    }

    /// Clears the password bucket, which `reset` leaves alone.
    pub fn reset_password(&self, password: &str) {
        self.password.reset(password);
        tracing::info!("reset password bucket");
    }

    /// Runs one eviction pass on every limiter.
    pub fn clean(&self) {
        self.login.clean();
        self.password.clean();
        self.address.clean();
    }

    pub async fn add_to_allow_list(&self, subnet: IpNet) -> Result<(), ServiceError> {
        self.add(ListKind::Allow, subnet).await
    }

    pub async fn add_to_deny_list(&self, subnet: IpNet) -> Result<(), ServiceError> {
        self.add(ListKind::Deny, subnet).await
    }

    pub async fn remove_from_allow_list(&self, subnet: IpNet) -> Result<(), ServiceError> {
        self.remove(ListKind::Allow, subnet).await
    }

    pub async fn remove_from_deny_list(&self, subnet: IpNet) -> Result<(), ServiceError> {
        self.remove(ListKind::Deny, subnet).await
    }

    /// Subnets on the given list.
    pub async fn list(&self, kind: ListKind) -> Result<Vec<IpNet>, ServiceError> {
        Ok(self.store(kind).list().await?)
    }

    fn store(&self, kind: ListKind) -> &dyn SubnetStore {
        match kind {
            ListKind::Allow => self.allow_list.as_ref(),
            ListKind::Deny => self.deny_list.as_ref(),
        }
    }

    pub async fn add(&self, kind: ListKind, subnet: IpNet) -> Result<(), ServiceError> {
        let subnet = canonical(subnet);
        let store = self.store(kind);

        if store.contains(&subnet).await? {
            return Err(ServiceError::AlreadyExists(subnet));
        }
        store
            .add(&subnet)
            .await
            .map_err(|e| ServiceError::from_store(e, subnet))?;

        tracing::info!(list = kind.label(), %subnet, "subnet added");
        Ok(())
    }

    pub async fn remove(&self, kind: ListKind, subnet: IpNet) -> Result<(), ServiceError> {
        let subnet = canonical(subnet);
        let store = self.store(kind);

        if !store.contains(&subnet).await? {
            return Err(ServiceError::NotFound(subnet));
        }
        store
            .remove(&subnet)
            .await
            .map_err(|e| ServiceError::from_store(e, subnet))?;

        tracing::info!(list = kind.label(), %subnet, "subnet removed");
        Ok(())
    }
}

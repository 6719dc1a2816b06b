// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::ops::RequiredAuthorities;
use crate::Error;
use freezone_types::config::{MAX_SIG_CHECK_ACCOUNTS, MAX_SIG_CHECK_DEPTH};
use freezone_types::{AccountName, Authority, PublicKey};
use std::collections::BTreeSet;

/// Resolves the current authority graph. Implemented by the chain state;
/// tests provide table-backed stubs.
pub trait AuthorityResolver {
    fn active(&self, name: &AccountName) -> Option<Authority>;
    fn owner(&self, name: &AccountName) -> Option<Authority>;
    fn posting(&self, name: &AccountName) -> Option<Authority>;
}

struct SignState<'a, R: AuthorityResolver> {
    provided_keys: &'a BTreeSet<PublicKey>,
    resolver: &'a R,
    approved: BTreeSet<AccountName>,
    expanded_accounts: usize,
}

impl<'a, R: AuthorityResolver> SignState<'a, R> {
    fn new(provided_keys: &'a BTreeSet<PublicKey>, resolver: &'a R) -> Self {
        SignState { provided_keys, resolver, approved: BTreeSet::new(), expanded_accounts: 0 }
    }

    /// Breadth-limited check that the provided keys can satisfy `auth`.
    /// Nested account members resolve through their active authority with a
    /// hard recursion depth and a global account-expansion budget.
    fn check(&mut self, auth: &Authority, depth: u32) -> Result<bool, Error> {
        let mut weight: u64 = 0;
        let threshold = auth.weight_threshold as u64;
        if threshold == 0 {
            return Ok(false);
        }
        for (key, w) in &auth.key_auths {
            if self.provided_keys.contains(key) {
                weight += *w as u64;
                if weight >= threshold {
                    return Ok(true);
                }
            }
        }
        for (name, w) in &auth.account_auths {
            if depth >= MAX_SIG_CHECK_DEPTH {
                continue;
            }
            let satisfied = if self.approved.contains(name) {
                true
            } else {
                self.expanded_accounts += 1;
                if self.expanded_accounts > MAX_SIG_CHECK_ACCOUNTS {
                    return Err(Error::TooManyAccounts);
                }
                match self.resolver.active(name) {
                    Some(inner) if self.check(&inner, depth + 1)? => {
                        self.approved.insert(name.clone());
                        true
                    }
                    _ => false,
                }
            };
            if satisfied {
                weight += *w as u64;
                if weight >= threshold {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Verifies that the recovered signing keys satisfy every authority the
/// operations declared.
///
/// Posting operations are segregated: a transaction demanding any posting
/// authority may demand nothing else, so low-privilege social keys can never
/// ride along with transfers.
pub fn verify_authority<R: AuthorityResolver>(
    required: &RequiredAuthorities,
    provided_keys: &BTreeSet<PublicKey>,
    resolver: &R,
) -> Result<(), Error> {
    if !required.posting.is_empty() {
        if !required.active.is_empty() || !required.owner.is_empty() || !required.other.is_empty()
        {
            return Err(Error::MixedAuthorityClasses);
        }
        for name in &required.posting {
            let mut state = SignState::new(provided_keys, resolver);
            let posting_ok = match resolver.posting(name) {
                Some(auth) => state.check(&auth, 0)?,
                None => false,
            };
            if posting_ok {
                continue;
            }
            let active_ok = match resolver.active(name) {
                Some(auth) => state.check(&auth, 0)?,
                None => false,
            };
            if active_ok {
                continue;
            }
            let owner_ok = match resolver.owner(name) {
                Some(auth) => state.check(&auth, 0)?,
                None => false,
            };
            if !owner_ok {
                return Err(Error::MissingPostingAuthority(name.clone()));
            }
        }
        return Ok(());
    }

    let mut state = SignState::new(provided_keys, resolver);

    for auth in &required.other {
        if !state.check(auth, 0)? {
            return Err(Error::MissingOtherAuthority);
        }
    }

    for name in &required.active {
        let active_ok = match resolver.active(name) {
            Some(auth) => state.check(&auth, 0)?,
            None => false,
        };
        if active_ok {
            continue;
        }
        let owner_ok = match resolver.owner(name) {
            Some(auth) => state.check(&auth, 0)?,
            None => false,
        };
        if !owner_ok {
            return Err(Error::MissingActiveAuthority(name.clone()));
        }
    }

    for name in &required.owner {
        let owner_ok = match resolver.owner(name) {
            Some(auth) => state.check(&auth, 0)?,
            None => false,
        };
        if !owner_ok {
            return Err(Error::MissingOwnerAuthority(name.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezone_types::PrivateKey;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MapResolver {
        active: BTreeMap<AccountName, Authority>,
        owner: BTreeMap<AccountName, Authority>,
        posting: BTreeMap<AccountName, Authority>,
    }

    impl AuthorityResolver for MapResolver {
        fn active(&self, name: &AccountName) -> Option<Authority> {
            self.active.get(name).cloned()
        }
        fn owner(&self, name: &AccountName) -> Option<Authority> {
            self.owner.get(name).cloned()
        }
        fn posting(&self, name: &AccountName) -> Option<Authority> {
            self.posting.get(name).cloned()
        }
    }

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn keyset(keys: &[&PrivateKey]) -> BTreeSet<PublicKey> {
        keys.iter().map(|k| k.public_key()).collect()
    }

    #[test]
    fn active_satisfied_by_own_key() {
        let key = PrivateKey::from_seed("alice-active");
        let mut resolver = MapResolver::default();
        resolver.active.insert(name("alice"), Authority::single_key(key.public_key()));

        let required = RequiredAuthorities { active: vec![name("alice")], ..Default::default() };
        verify_authority(&required, &keyset(&[&key]), &resolver).unwrap();

        let wrong = PrivateKey::from_seed("mallory");
        assert_eq!(
            verify_authority(&required, &keyset(&[&wrong]), &resolver),
            Err(Error::MissingActiveAuthority(name("alice")))
        );
    }

    #[test]
    fn owner_key_covers_active_requirement() {
        let owner_key = PrivateKey::from_seed("alice-owner");
        let mut resolver = MapResolver::default();
        resolver.active.insert(name("alice"), Authority::impossible());
        resolver.owner.insert(name("alice"), Authority::single_key(owner_key.public_key()));

        let required = RequiredAuthorities { active: vec![name("alice")], ..Default::default() };
        verify_authority(&required, &keyset(&[&owner_key]), &resolver).unwrap();
    }

    #[test]
    fn delegated_account_authority_resolves_through_active() {
        let bob_key = PrivateKey::from_seed("bob-active");
        let mut resolver = MapResolver::default();
        let mut alice_auth = Authority { weight_threshold: 1, ..Default::default() };
        alice_auth.account_auths.insert(name("bob"), 1);
        resolver.active.insert(name("alice"), alice_auth);
        resolver.active.insert(name("bob"), Authority::single_key(bob_key.public_key()));

        let required = RequiredAuthorities { active: vec![name("alice")], ..Default::default() };
        verify_authority(&required, &keyset(&[&bob_key]), &resolver).unwrap();
    }

    #[test]
    fn recursion_depth_is_capped() {
        // alice -> bob -> carol -> dave(key); depth cap of 2 cuts resolution
        // off before dave's key is reached.
        let dave_key = PrivateKey::from_seed("dave-active");
        let mut resolver = MapResolver::default();
        for (outer, inner) in [("alice", "bob"), ("bob", "carol"), ("carol", "dave")] {
            let mut auth = Authority { weight_threshold: 1, ..Default::default() };
            auth.account_auths.insert(name(inner), 1);
            resolver.active.insert(name(outer), auth);
        }
        resolver.active.insert(name("dave"), Authority::single_key(dave_key.public_key()));

        let required = RequiredAuthorities { active: vec![name("alice")], ..Default::default() };
        assert!(verify_authority(&required, &keyset(&[&dave_key]), &resolver).is_err());
    }

    #[test]
    fn posting_may_not_mix_with_active() {
        let key = PrivateKey::from_seed("alice");
        let mut resolver = MapResolver::default();
        resolver.posting.insert(name("alice"), Authority::single_key(key.public_key()));
        resolver.active.insert(name("alice"), Authority::single_key(key.public_key()));

        let required = RequiredAuthorities {
            posting: vec![name("alice")],
            active: vec![name("alice")],
            ..Default::default()
        };
        assert_eq!(
            verify_authority(&required, &keyset(&[&key]), &resolver),
            Err(Error::MixedAuthorityClasses)
        );
    }

    #[test]
    fn other_authority_checked_directly() {
        let key = PrivateKey::from_seed("witness-signing");
        let resolver = MapResolver::default();
        let required = RequiredAuthorities {
            other: vec![Authority::single_key(key.public_key())],
            ..Default::default()
        };
        verify_authority(&required, &keyset(&[&key]), &resolver).unwrap();
        assert_eq!(
            verify_authority(&required, &BTreeSet::new(), &resolver),
            Err(Error::MissingOtherAuthority)
        );
    }
}

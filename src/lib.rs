// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! # Keystone gatekeeper
//!
//! Authentication front door of a multi-tenant metrics gateway backed by an
//! OpenStack Keystone (v3) identity service.
//!
//! Requests present either a Keystone token (`X-Auth-Token`) or a basic
//! authentication whose username carries the user and, optionally, the
//! scope (`user[@domain][|project@domain]`, `user[@domain][|@domain]` or
//! `user[@domain][|project_id]`). The gatekeeper verifies the credentials
//! with Keystone, derives the [`policy::AuthorizationContext`] (user,
//! scope and roles) consumed by the policy evaluation and sets the identity
//! headers (`X-User-Id`, `X-Project-Id`, `X-Roles`, ...) on the request.
//!
//! In addition it resolves:
//!
//! - the projects below a project (to widen a project scope to its
//!   subtree),
//! - the projects on which a user holds one of the monitoring roles (to
//!   pick a scope for users presenting none),
//! - user IDs by name and domain.
//!
//! All identity provider lookups except the user logins run with the
//! privileges of a service user. Results are cached with a configurable
//! lifetime.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod keystone;
pub mod policy;
pub mod registry;
pub mod resource;
pub mod session;

#[cfg(test)]
mod tests;

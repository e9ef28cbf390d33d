//! Static route table: every public path, the service it forwards to and the
//! downstream call it names.

use axum::routing::MethodFilter;

use zyra_auth::Role;
use zyra_core::ServiceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn filter(&self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }

    /// Whether the payload comes from the query string instead of the body.
    pub fn reads_query(&self) -> bool {
        matches!(self, Verb::Get | Verb::Delete)
    }
}

#[derive(Debug)]
pub struct Route {
    pub verb: Verb,
    pub path: &'static str,
    pub call: &'static str,
}

#[derive(Debug)]
pub struct RouteGroup {
    pub prefix: &'static str,
    pub service: ServiceName,
    /// `None` for public groups.
    pub role: Option<Role>,
    /// Browser-facing: answers CORS preflights for the configured origins.
    pub cors: bool,
    pub routes: &'static [Route],
}

const fn route(verb: Verb, path: &'static str, call: &'static str) -> Route {
    Route { verb, path, call }
}

use Verb::{Delete, Get, Patch, Post, Put};

pub const AUTH: RouteGroup = RouteGroup {
    prefix: "/auth",
    service: ServiceName::Auth,
    role: None,
    cors: false,
    routes: &[
        route(Post, "/register", "Register"),
        route(Post, "/login", "Login"),
        route(Post, "/send-otp", "SendOTP"),
        route(Post, "/verify-otp", "VerifyOTP"),
        route(Post, "/logout", "Logout"),
    ],
};

pub const ADMIN: RouteGroup = RouteGroup {
    prefix: "/admin",
    service: ServiceName::Admin,
    role: Some(Role::Admin),
    cors: false,
    routes: &[
        route(Post, "/approve-reject", "ApproveRejectCategory"),
        route(Put, "/block-user", "BlockUser"),
        route(Put, "/unblock-user", "UnblockUser"),
        route(Get, "/users", "ListUsers"),
        route(Get, "/view-requests", "ViewCategoryRequests"),
        route(Post, "/add-category", "AddCategory"),
        route(Get, "/dashboard", "AdminDashboard"),
        route(Get, "/wallet", "GetAdminWallet"),
    ],
};

pub const VENDOR: RouteGroup = RouteGroup {
    prefix: "/vendor",
    service: ServiceName::Vendor,
    role: Some(Role::Vendor),
    cors: false,
    routes: &[
        route(Post, "/request-category", "RequestCategory"),
        route(Get, "/list-categories", "ListCategory"),
        route(Get, "/me", "VendorProfile"),
        route(Put, "/me", "UpdateProfile"),
        route(Get, "/services", "GetServices"),
        route(Post, "/service", "CreateService"),
        route(Put, "/service", "UpdateService"),
        route(Patch, "/reset", "ResetPassword"),
        route(Get, "/dashboard", "VendorDashBoard"),
        route(Get, "/requests", "GetBookingRequests"),
        route(Post, "/approve-booking", "ApproveBooking"),
    ],
};

pub const CLIENT: RouteGroup = RouteGroup {
    prefix: "/client",
    service: ServiceName::Client,
    role: Some(Role::Client),
    cors: true,
    routes: &[
        route(Post, "/mc/payment", "CreateBookingPayment"),
        route(Post, "/host-event", "HostEvent"),
        route(Put, "/edit-event", "EditEvent"),
        route(Get, "/profile", "ClientProfile"),
        route(Put, "/profile", "EditClientProfile"),
        route(Put, "/reset-password", "ResetPassword"),
        route(Get, "/bookings", "GetBookings"),
        route(Get, "/dashboard", "ClientDashboard"),
        route(Post, "/booking", "BookVendor"),
        route(Get, "/vendors", "GetVendorsByCategory"),
        route(Get, "/hosted-events", "GetHostedEvents"),
        route(Get, "/upcoming-events", "GetUpcomingEvents"),
        route(Get, "/vendor-profile", "GetVendorProfile"),
        route(Post, "/review-ratings", "AddClientReviewRatings"),
        route(Put, "/review-ratings", "EditClientReviewRatings"),
        route(Delete, "/review-ratings", "DeleteReview"),
        route(Get, "/review-ratings", "ViewClientReviewRatings"),
        route(Get, "/wallet", "GetClientWallet"),
        route(Get, "/transactions", "GetClientTransactions"),
        route(Post, "/complete-booking", "CompleteVendorBooking"),
        route(Post, "/cancel-booking", "CancelVendorBooking"),
    ],
};

pub const GROUPS: [&RouteGroup; 4] = [&AUTH, &ADMIN, &VENDOR, &CLIENT];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn each_group_targets_its_own_service() {
        for group in GROUPS {
            assert_eq!(group.prefix, format!("/{}", group.service.as_str()));
        }
    }

    #[test]
    fn only_auth_is_public() {
        let public: Vec<_> = GROUPS.iter().filter(|g| g.role.is_none()).map(|g| g.prefix).collect();
        assert_eq!(public, vec!["/auth"]);
        for group in GROUPS.iter().filter(|g| g.role.is_some()) {
            assert_eq!(group.role.map(|r| r.as_str()), Some(group.service.as_str()));
        }
    }

    #[test]
    fn only_client_answers_cors() {
        let cors: Vec<_> = GROUPS.iter().filter(|g| g.cors).map(|g| g.prefix).collect();
        assert_eq!(cors, vec!["/client"]);
    }

    #[test]
    fn no_duplicate_method_and_path() {
        for group in GROUPS {
            let mut seen = HashSet::new();
            for r in group.routes {
                assert!(seen.insert((r.verb as u8, r.path)), "{} {}", group.prefix, r.path);
            }
        }
    }
}

//! Configuration module

mod site;

pub use site::OrganizationConfig;
pub use site::SiteConfig;
pub use site::SitemapRoute;
pub use site::SITE_URL_ENV;

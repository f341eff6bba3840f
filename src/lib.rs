/*!
# Zone Supervisor Dashboard

An internal web dashboard for delivery-zone supervisors. Each zone shares a
gate password; once logged in, a supervisor sees only their zone's slice of
the shared operations spreadsheet and can export it as an Excel workbook.

## Architecture

Browser request → session guard → route handler → sheet gateway (remote
fetch) → data cleaning → zone filter → template render or file download.

- **Sheet gateway**: authenticates to the spreadsheet service with a
  service-account key on every request and retrieves named tabs as
  header-keyed rows.
- **Data cleaning**: numeric coercion over the sheet's sentinel values and
  forward-filling of merged-cell date columns.
- **Sessions**: signed cookie carrying a server-side session id, 24 hour
  expiry.
- **Views**: one handler per dashboard page, each a fetch/filter/aggregate
  composition over the gateway.
- **Export**: the zone's roster rows re-serialized as a one-sheet xlsx
  attachment.

## Modules

- **config**: environment inputs and the static password tables
- **error**: error taxonomy and HTTP mapping
- **sheets**: remote spreadsheet gateway
- **clean**: cell normalization helpers
- **auth**: sessions, login/logout, route guard
- **views**: view models and page handlers
- **export**: xlsx download
- **app**: routing and server startup
*/

pub mod app;
pub mod auth;
pub mod clean;
pub mod config;
pub mod error;
pub mod export;
pub mod sheets;
pub mod views;

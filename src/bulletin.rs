// Station bulletin module
//
// Handles the Met Office "historic station data" text bulletins. A bulletin is
// a free-text preamble followed by a `yyyy mm tmax tmin af rain sun` header and
// one whitespace-aligned row per station month. Values may carry `*`
// (estimated) or `#` (automatic sensor) markers, and `---` marks missing data.

pub mod normalize;
pub mod parser;
pub mod record;

pub use normalize::NormalizedMeasurement;
pub use parser::{find_header, parse_bulletin, BulletinError, Column};
pub use record::StationRecord;

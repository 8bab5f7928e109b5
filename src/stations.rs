use serde::Serialize;
use utoipa::ToSchema;

/// Directory holding the Met Office historic station bulletins
pub const DEFAULT_STATION_BASE_URL: &str =
    "https://www.metoffice.gov.uk/pub/data/weather/uk/climate/stationdata/";

/// Station slug and bulletin file name for every published station.
/// File names follow `<slug>data.txt` except where the site was renamed.
const CATALOGUE: &[(&str, &str)] = &[
    ("aberporth", "aberporthdata.txt"),
    ("armagh", "armaghdata.txt"),
    ("ballypatrick", "ballypatrickdata.txt"),
    ("bradford", "bradforddata.txt"),
    ("braemar", "braemardata.txt"),
    ("camborne", "cambornedata.txt"),
    ("cambridge", "cambridgedata.txt"),
    ("cardiff", "cardiffdata.txt"),
    ("chivenor", "chivenordata.txt"),
    ("cwmystwyth", "cwmystwythdata.txt"),
    ("dunstaffnage", "dunstaffnagedata.txt"),
    ("durham", "durhamdata.txt"),
    ("eastbourne", "eastbournedata.txt"),
    ("eskdalemuir", "eskdalemuirdata.txt"),
    ("heathrow", "heathrowdata.txt"),
    ("hurn", "hurndata.txt"),
    ("lerwick", "lerwickdata.txt"),
    ("leuchars", "leucharsdata.txt"),
    ("lowestoft", "lowestoftdata.txt"),
    ("manston", "manstondata.txt"),
    ("nairn", "nairndata.txt"),
    ("newtonrigg", "newtonriggdata.txt"),
    ("oxford", "oxforddata.txt"),
    ("paisley", "paisleydata.txt"),
    ("ringway", "ringwaydata.txt"),
    ("rossonwye", "rossonwyedata.txt"),
    ("shawbury", "shawburydata.txt"),
    ("sheffield", "sheffielddata.txt"),
    ("southampton", "southamptondata.txt"),
    ("stornoway", "stornowaydata.txt"),
    ("valley", "valleydata.txt"),
    ("waddington", "waddingtondata.txt"),
    ("whitby", "whitbydata.txt"),
    ("wick", "wickairportdata.txt"),
    ("yeovilton", "yeoviltondata.txt"),
];

/// A configured station and the URL of its bulletin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Station {
    pub id: String,
    pub url: String,
}

impl Station {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// All catalogue station IDs, in catalogue order
pub fn catalogue_ids() -> impl Iterator<Item = &'static str> {
    CATALOGUE.iter().map(|(id, _)| *id)
}

pub fn is_known_station(id: &str) -> bool {
    catalogue_ids().any(|known| known == id)
}

/// Full catalogue resolved against a base URL
pub fn station_catalogue(base_url: &str) -> Vec<Station> {
    CATALOGUE
        .iter()
        .map(|(id, file)| Station::new(*id, bulletin_url(base_url, file)))
        .collect()
}

/// Catalogue subset in the order requested; the first unknown ID is the error
pub fn select_stations(base_url: &str, ids: &[String]) -> Result<Vec<Station>, String> {
    ids.iter()
        .map(|id| {
            CATALOGUE
                .iter()
                .find(|(known, _)| *known == id.as_str())
                .map(|(known, file)| Station::new(*known, bulletin_url(base_url, file)))
                .ok_or_else(|| id.clone())
        })
        .collect()
}

fn bulletin_url(base_url: &str, file: &str) -> String {
    if base_url.ends_with('/') {
        format!("{base_url}{file}")
    } else {
        format!("{base_url}/{file}")
    }
}

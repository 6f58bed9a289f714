//! Static catalogs: provider region maps and the infrastructure overview.
//! Nothing here touches the network.

use crate::api::utils::{now_iso, ok_json};
use crate::errors::PortalError;
use crate::handler::RouteHandler;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Request, Response};
use rand::Rng;
use serde::Serialize;
use std::ops::Range;

const ZONES_PER_REGION: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    Operational,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Region {
    pub id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub status: RegionStatus,
}

const fn region(id: &'static str, name: &'static str, lat: f64, lon: f64) -> Region {
    Region {
        id,
        name,
        lat,
        lon,
        status: RegionStatus::Operational,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStats {
    pub total_regions: usize,
    pub operational_regions: usize,
    pub availability_zones: usize,
    pub edge_locations: u32,
    pub estimated_requests: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionsResponse<'a> {
    success: bool,
    regions: &'a [Region],
    stats: RegionStats,
    last_updated: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Aws,
    Google,
}

impl Provider {
    pub fn regions(&self) -> &'static [Region] {
        match self {
            Provider::Aws => AWS_REGIONS,
            Provider::Google => GOOGLE_REGIONS,
        }
    }

    fn edge_locations(&self) -> u32 {
        match self {
            Provider::Aws => 450,
            Provider::Google => 200,
        }
    }

    /// Requests per second shown on the globe. Illustrative only.
    fn request_range(&self) -> Range<u64> {
        match self {
            Provider::Aws => 5_000_000..6_000_000,
            Provider::Google => 3_000_000..3_800_000,
        }
    }

    pub fn stats(&self) -> RegionStats {
        let regions = self.regions();
        RegionStats {
            total_regions: regions.len(),
            operational_regions: regions
                .iter()
                .filter(|r| r.status == RegionStatus::Operational)
                .count(),
            availability_zones: regions.len() * ZONES_PER_REGION,
            edge_locations: self.edge_locations(),
            estimated_requests: rand::rng().random_range(self.request_range()),
        }
    }
}

/// `GET /api/aws-regions` and `GET /api/google-regions`
pub struct RegionsHandler {
    provider: Provider,
}

impl RegionsHandler {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RouteHandler for RegionsHandler {
    fn name(&self) -> &'static str {
        match self.provider {
            Provider::Aws => "aws_regions",
            Provider::Google => "google_regions",
        }
    }

    async fn handle(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, PortalError> {
        ok_json(&RegionsResponse {
            success: true,
            regions: self.provider.regions(),
            stats: self.provider.stats(),
            last_updated: now_iso(),
        })
    }
}

#[derive(Debug, Serialize)]
struct Component {
    name: &'static str,
    status: RegionStatus,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct Architecture {
    flow: &'static [&'static str],
    security: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct InfrastructureResponse {
    success: bool,
    components: Vec<Component>,
    architecture: Architecture,
}

/// `GET /api/infrastructure`
pub struct InfrastructureHandler;

#[async_trait]
impl RouteHandler for InfrastructureHandler {
    fn name(&self) -> &'static str {
        "infrastructure"
    }

    async fn handle(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, PortalError> {
        let components = [
            ("K3s Cluster", "Lightweight Kubernetes distribution"),
            ("Contour", "Gateway API controller"),
            ("Gateway API", "Kubernetes networking standard"),
            ("Envoy Proxy", "High-performance proxy"),
            ("Terraform", "Infrastructure as Code"),
            ("Grafana Cloud", "Observability platform"),
        ]
        .into_iter()
        .map(|(name, description)| Component {
            name,
            status: RegionStatus::Operational,
            description,
        })
        .collect();

        ok_json(&InfrastructureResponse {
            success: true,
            components,
            architecture: Architecture {
                flow: &[
                    "Internet",
                    "Cloudflare (WAF, DNS, SSL)",
                    "Contour/Envoy Gateway",
                    "K3s Cluster",
                    "Application Pods",
                ],
                security: &[
                    "Cloudflare WAF (Edge Protection)",
                    "Network Policies (Pod Isolation)",
                    "Security Contexts (Non-Root, Dropped Capabilities)",
                    "Security Headers (CSP, X-Frame-Options)",
                ],
            },
        })
    }
}

const AWS_REGIONS: &[Region] = &[
    region("us-east-1", "US East (N. Virginia)", 39.0438, -77.4874),
    region("us-east-2", "US East (Ohio)", 40.4173, -82.9071),
    region("us-west-1", "US West (N. California)", 37.7749, -122.4194),
    region("us-west-2", "US West (Oregon)", 45.5231, -122.6765),
    region("ca-central-1", "Canada (Central)", 45.5017, -73.5673),
    region("eu-west-1", "Europe (Ireland)", 53.3498, -6.2603),
    region("eu-west-2", "Europe (London)", 51.5074, -0.1278),
    region("eu-west-3", "Europe (Paris)", 48.8566, 2.3522),
    region("eu-central-1", "Europe (Frankfurt)", 50.1109, 8.6821),
    region("eu-north-1", "Europe (Stockholm)", 59.3293, 18.0686),
    region("ap-northeast-1", "Asia Pacific (Tokyo)", 35.6762, 139.6503),
    region("ap-northeast-2", "Asia Pacific (Seoul)", 37.5665, 126.9780),
    region("ap-northeast-3", "Asia Pacific (Osaka)", 34.6937, 135.5023),
    region("ap-southeast-1", "Asia Pacific (Singapore)", 1.3521, 103.8198),
    region("ap-southeast-2", "Asia Pacific (Sydney)", -33.8688, 151.2093),
    region("ap-south-1", "Asia Pacific (Mumbai)", 19.0760, 72.8777),
    region("sa-east-1", "South America (São Paulo)", -23.5505, -46.6333),
    region("af-south-1", "Africa (Cape Town)", -33.9249, 18.4241),
    region("me-south-1", "Middle East (Bahrain)", 26.0667, 50.5577),
];

const GOOGLE_REGIONS: &[Region] = &[
    region("us-central1", "US Central (Iowa)", 41.8781, -93.0977),
    region("us-east1", "US East (South Carolina)", 33.8361, -81.1637),
    region("us-east4", "US East (Virginia)", 37.4316, -78.6569),
    region("us-west1", "US West (Oregon)", 45.5152, -122.6784),
    region("us-west2", "US West (Los Angeles)", 34.0522, -118.2437),
    region("us-west3", "US West (Salt Lake City)", 40.7608, -111.8910),
    region("us-west4", "US West (Las Vegas)", 36.1699, -115.1398),
    region("europe-west1", "Europe West (Belgium)", 50.8503, 4.3517),
    region("europe-west2", "Europe West (London)", 51.5074, -0.1278),
    region("europe-west3", "Europe West (Frankfurt)", 50.1109, 8.6821),
    region("europe-west4", "Europe West (Netherlands)", 52.3676, 4.9041),
    region("europe-west6", "Europe West (Zurich)", 47.3769, 8.5417),
    region("europe-west8", "Europe West (Milan)", 45.4642, 9.1900),
    region("europe-west9", "Europe West (Paris)", 48.8566, 2.3522),
    region("europe-west10", "Europe West (Warsaw)", 52.2297, 21.0122),
    region("europe-north1", "Europe North (Finland)", 60.1699, 24.9384),
    region("asia-northeast1", "Asia Northeast (Tokyo)", 35.6762, 139.6503),
    region("asia-northeast2", "Asia Northeast (Osaka)", 34.6937, 135.5023),
    region("asia-southeast1", "Asia Southeast (Singapore)", 1.3521, 103.8198),
    region("asia-southeast2", "Asia Southeast (Sydney)", -33.8688, 151.2093),
    region("asia-south1", "Asia South (Mumbai)", 19.0760, 72.8777),
    region("asia-east1", "Asia East (Hong Kong)", 22.3193, 114.1694),
    region("asia-east2", "Asia East (Taiwan)", 25.0330, 121.5654),
    region("southamerica-east1", "South America East (São Paulo)", -23.5505, -46.6333),
    region("me-west1", "Middle East West (Tel Aviv)", 32.0853, 34.7818),
    region("africa-south1", "Africa South (Johannesburg)", -26.2041, 28.0473),
];

/// Abstract Syntax Tree for job scripts
/// A script is a flat list of queries evaluated against the selected material

pub type Span = std::ops::Range<usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Byte range in the source
    pub span: Span,
    /// 1-based source line
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Select the material later queries apply to
    Material(String),
    Force(ForceQuery),
    Stress(StressQuery),
    Life(LifeQuery),
    Speed(SpeedQuery),
    /// Operation kept as written; unknown names fail at evaluation
    Recommend(String),
}

/// `force chip <h> [width <b>] [temp <T>] [speed <v>] [geometry]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForceQuery {
    pub chip_thickness_mm: f64,
    /// With a width the query yields Fc in N, otherwise kc in N/mm²
    pub chip_width_mm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub speed_m_min: Option<f64>,
    pub geometry: bool,
}

/// `stress strain <eps> rate <eps_dot> temp <T>`
#[derive(Debug, Clone, PartialEq)]
pub struct StressQuery {
    pub strain: f64,
    pub strain_rate: f64,
    pub temperature_c: f64,
}

/// `life speed <v> depth <d> coolant <name>`
#[derive(Debug, Clone, PartialEq)]
pub struct LifeQuery {
    pub speed_m_min: f64,
    pub depth_mm: f64,
    pub coolant: String,
}

/// `speed life <T> depth <d> coolant <name>`
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedQuery {
    pub life_min: f64,
    pub depth_mm: f64,
    pub coolant: String,
}

impl StatementKind {
    /// Leading keyword, for reports
    pub fn keyword(&self) -> &'static str {
        match self {
            StatementKind::Material(_) => "material",
            StatementKind::Force(_) => "force",
            StatementKind::Stress(_) => "stress",
            StatementKind::Life(_) => "life",
            StatementKind::Speed(_) => "speed",
            StatementKind::Recommend(_) => "recommend",
        }
    }
}

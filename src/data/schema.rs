//! Canonical Column Vocabulary
//! Fixed column names and the literal synonym table used to reach them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical column of a normalized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalColumn {
    CodigoInstitucion,
    Institucion,
    CodigoSnies,
    ProgramaAcademico,
    Anio,
    Semestre,
    Admitidos,
    NuevosMatriculados,
    TotalMatriculados,
    Inscritos,
    Graduados,
}

impl CanonicalColumn {
    /// Columns every accepted table must carry.
    pub const REQUIRED: [CanonicalColumn; 6] = [
        CanonicalColumn::CodigoInstitucion,
        CanonicalColumn::Institucion,
        CanonicalColumn::CodigoSnies,
        CanonicalColumn::ProgramaAcademico,
        CanonicalColumn::Anio,
        CanonicalColumn::Semestre,
    ];

    /// Numeric metrics that may be absent from a given table.
    pub const METRICS: [CanonicalColumn; 5] = [
        CanonicalColumn::Admitidos,
        CanonicalColumn::NuevosMatriculados,
        CanonicalColumn::TotalMatriculados,
        CanonicalColumn::Inscritos,
        CanonicalColumn::Graduados,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalColumn::CodigoInstitucion => "codigo_institucion",
            CanonicalColumn::Institucion => "institucion",
            CanonicalColumn::CodigoSnies => "codigo_snies",
            CanonicalColumn::ProgramaAcademico => "programa_academico",
            CanonicalColumn::Anio => "anio",
            CanonicalColumn::Semestre => "semestre",
            CanonicalColumn::Admitidos => "admitidos",
            CanonicalColumn::NuevosMatriculados => "nuevos_matriculados",
            CanonicalColumn::TotalMatriculados => "total_matriculados",
            CanonicalColumn::Inscritos => "inscritos",
            CanonicalColumn::Graduados => "graduados",
        }
    }

    /// Literal header strings (case-sensitive) that denote this column.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            CanonicalColumn::CodigoInstitucion => &["CÓDIGO DE LA INSTITUCIÓN"],
            CanonicalColumn::Institucion => &["INSTITUCIÓN DE EDUCACIÓN SUPERIOR (IES)"],
            CanonicalColumn::CodigoSnies => &["CÓDIGO SNIES DEL PROGRAMA"],
            CanonicalColumn::ProgramaAcademico => &["PROGRAMA ACADÉMICO", "programa académico"],
            CanonicalColumn::Anio => &["AÑO"],
            CanonicalColumn::Semestre => &["SEMESTRE"],
            CanonicalColumn::Admitidos => &["ADMITIDOS"],
            CanonicalColumn::NuevosMatriculados => &["MATRICULADOS PRIMER CURSO", "PRIMER CURSO"],
            CanonicalColumn::TotalMatriculados => &["MATRICULADOS"],
            CanonicalColumn::Inscritos => &["INSCRITOS"],
            CanonicalColumn::Graduados => &["GRADUADOS"],
        }
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    pub fn all() -> impl Iterator<Item = CanonicalColumn> {
        Self::REQUIRED.into_iter().chain(Self::METRICS)
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptive attributes canonicalised alongside the enumerated vocabulary.
/// They take no part in validation or aggregation.
pub const DESCRIPTIVE_SYNONYMS: &[(&str, &[&str])] = &[
    ("ies_padre", &["IES PADRE", "IES_PADRE"]),
    ("tipo_ies", &["TIPO IES", "PRINCIPAL O SECCIONAL"]),
    ("id_sector", &["ID SECTOR IES"]),
    ("sector_ies", &["SECTOR IES"]),
    ("id_caracter", &["ID CARÁCTER IES", "ID CARACTER"]),
    ("caracter_ies", &["CARÁCTER IES", "CARACTER IES"]),
    ("codigo_departamento_ies", &["CÓDIGO DEL DEPARTAMENTO (IES)"]),
    ("departamento_domicilio_ies", &["DEPARTAMENTO DE DOMICILIO DE LA IES"]),
    ("codigo_municipio_ies", &["CÓDIGO DEL MUNICIPIO IES", "CÓDIGO DEL MUNICIPIO (IES)"]),
    ("municipio_domicilio_ies", &["MUNICIPIO DE DOMICILIO DE LA IES"]),
    ("id_nivel_academico", &["ID NIVEL ACADÉMICO"]),
    ("nivel_academico", &["NIVEL ACADÉMICO"]),
    ("id_nivel_formacion", &["ID NIVEL DE FORMACIÓN"]),
    ("nivel_formacion", &["NIVEL DE FORMACIÓN"]),
    ("id_metodologia", &["ID METODOLOGÍA", "ID MODALIDAD"]),
    ("metodologia", &["METODOLOGÍA", "MODALIDAD"]),
    ("id_area", &["ID ÁREA", "ID ÁREA DE CONOCIMIENTO"]),
    ("area_conocimiento", &["ÁREA DE CONOCIMIENTO"]),
    ("id_nucleo", &["ID NÚCLEO"]),
    ("nucleo_basico_conocimiento", &["NÚCLEO BÁSICO DEL CONOCIMIENTO (NBC)"]),
    ("id_cine_campo_amplio", &["ID CINE CAMPO AMPLIO"]),
    ("desc_cine_campo_amplio", &["DESC CINE CAMPO AMPLIO"]),
    ("id_cine_campo_especifico", &["ID CINE CAMPO ESPECIFICO"]),
    ("desc_cine_campo_especifico", &["DESC CINE CAMPO ESPECIFICO"]),
    ("id_cine_campo_detallado", &["ID CINE CODIGO DETALLADO", "ID CINE CAMPO DETALLADO"]),
    ("desc_cine_campo_detallado", &["DESC CINE CODIGO DETALLADO", "DESC CINE CAMPO DETALLADO"]),
    ("codigo_departamento_programa", &["CÓDIGO DEL DEPARTAMENTO (PROGRAMA)"]),
    ("departamento_oferta_programa", &["DEPARTAMENTO DE OFERTA DEL PROGRAMA"]),
    ("codigo_municipio_programa", &["CÓDIGO DEL MUNICIPIO (PROGRAMA)"]),
    ("municipio_oferta_programa", &["MUNICIPIO DE OFERTA DEL PROGRAMA"]),
    ("id_sexo", &["ID SEXO"]),
    ("sexo", &["SEXO"]),
];

/// Every (canonical name, synonyms) pair, enumerated columns first.
pub fn synonym_entries() -> impl Iterator<Item = (&'static str, &'static [&'static str])> {
    CanonicalColumn::all()
        .map(|column| (column.name(), column.synonyms()))
        .chain(DESCRIPTIVE_SYNONYMS.iter().copied())
}

/// Source-id keywords and the metrics a matching source should carry.
/// Checked in order; the first keyword found wins.
const SOURCE_KEYWORDS: &[(&str, &[CanonicalColumn])] = &[
    ("admitidos", &[CanonicalColumn::Admitidos]),
    ("graduados", &[CanonicalColumn::Graduados]),
    ("inscritos", &[CanonicalColumn::Inscritos]),
    ("primer_curso", &[CanonicalColumn::NuevosMatriculados]),
    (
        "matriculados",
        &[CanonicalColumn::TotalMatriculados, CanonicalColumn::NuevosMatriculados],
    ),
];

/// Optional metrics a source is expected to carry, guessed from its identifier.
pub fn expected_metrics(source_id: &str) -> &'static [CanonicalColumn] {
    let key = source_id.to_lowercase().replace([' ', '-'], "_");
    SOURCE_KEYWORDS
        .iter()
        .find(|(keyword, _)| key.contains(keyword))
        .map(|(_, columns)| *columns)
        .unwrap_or(&[])
}

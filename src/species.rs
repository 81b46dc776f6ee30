//! Static metadata for the snake species the classifier knows about.
//!
//! The variant order is the model's class-index order, which is alphabetical by
//! scientific name. Changing it without re-exporting the model will silently
//! mislabel every prediction.

use serde::Serialize;

/// How dangerous a bite is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hazard {
    #[serde(rename = "Non-venomous")]
    NonVenomous,
    #[serde(rename = "Mildly venomous")]
    MildlyVenomous,
    #[serde(rename = "Venomous")]
    Venomous,
    #[serde(rename = "Highly venomous")]
    HighlyVenomous,
}

/// Display metadata for one species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesInfo {
    pub common_name: &'static str,
    pub nepali_name: &'static str,
    pub danger: Hazard,
    pub habitat: &'static str,
}

/// A species the classifier can predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    AhaetullaNasuta,
    AmphiesmaStolatum,
    BoigaOchracea,
    BoigaTrigonata,
    BungarusCaeruleus,
    BungarusFasciatus,
    CalliophisBivirgatus,
    CoelognathusRadiatus,
    CraspedocephalusAlbolabris,
    DaboiaRusselii,
    DendrelaphisTristis,
    EryxJohnii,
    GloydiusHimalayanus,
    IndotyphlopsBraminus,
    LycodonAulicus,
    NajaKaouthia,
    NajaNaja,
    OligodonArnensis,
    OphiophagusHannah,
    OreocryptophisPorphyraceus,
    OvophisMonticola,
    PtyasMucosa,
    PythonMolurus,
    RhabdophisSubminiatus,
    SibynophisSubpunctatus,
    XenochrophisPiscator,
}

impl Species {
    /// Every species, indexed by model class.
    pub const ALL: [Species; 26] = [
        Species::AhaetullaNasuta,
        Species::AmphiesmaStolatum,
        Species::BoigaOchracea,
        Species::BoigaTrigonata,
        Species::BungarusCaeruleus,
        Species::BungarusFasciatus,
        Species::CalliophisBivirgatus,
        Species::CoelognathusRadiatus,
        Species::CraspedocephalusAlbolabris,
        Species::DaboiaRusselii,
        Species::DendrelaphisTristis,
        Species::EryxJohnii,
        Species::GloydiusHimalayanus,
        Species::IndotyphlopsBraminus,
        Species::LycodonAulicus,
        Species::NajaKaouthia,
        Species::NajaNaja,
        Species::OligodonArnensis,
        Species::OphiophagusHannah,
        Species::OreocryptophisPorphyraceus,
        Species::OvophisMonticola,
        Species::PtyasMucosa,
        Species::PythonMolurus,
        Species::RhabdophisSubminiatus,
        Species::SibynophisSubpunctatus,
        Species::XenochrophisPiscator,
    ];

    /// Number of classes the model must output.
    pub const COUNT: usize = Self::ALL.len();

    pub fn from_index(index: usize) -> Option<Species> {
        Self::ALL.get(index).copied()
    }

    /// Class label as used in the training set, e.g. `Naja_naja`.
    pub fn identifier(self) -> &'static str {
        match self {
            Species::AhaetullaNasuta => "Ahaetulla_nasuta",
            Species::AmphiesmaStolatum => "Amphiesma_stolatum",
            Species::BoigaOchracea => "Boiga_ochracea",
            Species::BoigaTrigonata => "Boiga_trigonata",
            Species::BungarusCaeruleus => "Bungarus_caeruleus",
            Species::BungarusFasciatus => "Bungarus_fasciatus",
            Species::CalliophisBivirgatus => "Calliophis_bivirgatus",
            Species::CoelognathusRadiatus => "Coelognathus_radiatus",
            Species::CraspedocephalusAlbolabris => "Craspedocephalus_albolabris",
            Species::DaboiaRusselii => "Daboia_russelii",
            Species::DendrelaphisTristis => "Dendrelaphis_tristis",
            Species::EryxJohnii => "Eryx_johnii",
            Species::GloydiusHimalayanus => "Gloydius_himalayanus",
            Species::IndotyphlopsBraminus => "Indotyphlops_braminus",
            Species::LycodonAulicus => "Lycodon_aulicus",
            Species::NajaKaouthia => "Naja_kaouthia",
            Species::NajaNaja => "Naja_naja",
            Species::OligodonArnensis => "Oligodon_arnensis",
            Species::OphiophagusHannah => "Ophiophagus_hannah",
            Species::OreocryptophisPorphyraceus => "Oreocryptophis_porphyraceus",
            Species::OvophisMonticola => "Ovophis_monticola",
            Species::PtyasMucosa => "Ptyas_mucosa",
            Species::PythonMolurus => "Python_molurus",
            Species::RhabdophisSubminiatus => "Rhabdophis_subminiatus",
            Species::SibynophisSubpunctatus => "Sibynophis_subpunctatus",
            Species::XenochrophisPiscator => "Xenochrophis_piscator",
        }
    }

    pub fn info(self) -> SpeciesInfo {
        use Hazard::*;

        let (common_name, nepali_name, danger, habitat) = match self {
            Species::AhaetullaNasuta => (
                "Sri Lankan Green Vine Snake",
                "हरियो लताके सर्प (Hariyo Latake Sarpa)",
                MildlyVenomous,
                "Forests, shrubs",
            ),
            Species::AmphiesmaStolatum => (
                "Buff Striped Keelback",
                "बगाले सर्प (Bagale Sarpa), आहारा (Aahara), हररा (Harara)",
                NonVenomous,
                "Wetlands, rice fields",
            ),
            Species::BoigaOchracea => (
                "Tawny Cat Snake",
                "बिरालो सर्प (Biralo Sarpa)",
                MildlyVenomous,
                "Forests",
            ),
            Species::BoigaTrigonata => (
                "Common Cat Snake",
                "बिरालो सर्प (Biralo Sarpa)",
                MildlyVenomous,
                "Scrub forests, rocky terrain",
            ),
            Species::BungarusCaeruleus => (
                "Common Krait",
                "करेत (Krait), Seto-kalo Chure Sarpa",
                HighlyVenomous,
                "Forests, fields",
            ),
            Species::BungarusFasciatus => (
                "Banded Krait",
                "गनगलि, गनग्वली (Gangawari, Panhelo-kalo Chure Sarpa, Kanthamala, Laxmi Sanp, Raja Sanp, Maher, Gwala Sarpa, Ahiriniya Sanp)",
                HighlyVenomous,
                "Forests, grasslands",
            ),
            Species::CalliophisBivirgatus => (
                "Blue Coral Snake",
                "नीलो मूँगा सर्प (Nilo Moonga Sarpa)",
                HighlyVenomous,
                "Rainforests",
            ),
            Species::CoelognathusRadiatus => (
                "Copperhead Racer",
                "तामाको टाउको सर्प (Tamako Tauko Sarpa)",
                NonVenomous,
                "Forests, farmlands",
            ),
            Species::CraspedocephalusAlbolabris => (
                "White-lipped Pit Viper",
                "सेतो ओठे सर्प (Seto Othe Sarpa)",
                Venomous,
                "Himalayan forests",
            ),
            Species::DaboiaRusselii => (
                "Russell's Viper",
                "बाघ सर्प (Baghe sarpa), Suskar",
                HighlyVenomous,
                "Grasslands, farmlands",
            ),
            Species::DendrelaphisTristis => (
                "Bronze-backed Tree Snake",
                "काँसे ढाडे सर्प (Kanse Dhade Sarpa)",
                NonVenomous,
                "Trees, gardens",
            ),
            Species::EryxJohnii => (
                "Red Sand Boa",
                "दुईमुखे सर्प (Duimukhe Sarpa), बालुवा सर्प (Baluwa Sarpa)",
                NonVenomous,
                "Deserts, scrublands",
            ),
            Species::GloydiusHimalayanus => (
                "Himalayan Pit Viper",
                "भ्यागुते सर्प (Bhyagute Sarpa)",
                Venomous,
                "Himalayan forests",
            ),
            Species::IndotyphlopsBraminus => (
                "Brahminy Blind Snake",
                "अन्धो सर्प (Andho Sarpa)",
                NonVenomous,
                "Soil, compost piles",
            ),
            Species::LycodonAulicus => (
                "Common Wolf Snake",
                "ब्वाँसो सर्प (Bwanso Sarpa)",
                NonVenomous,
                "Urban areas, forests",
            ),
            Species::NajaKaouthia => (
                "Monocled Cobra",
                "गोमन (Goman)",
                HighlyVenomous,
                "Wetlands, forests",
            ),
            Species::NajaNaja => (
                "Indian Cobra",
                "गोमन (Goman)",
                HighlyVenomous,
                "Plains, forests",
            ),
            Species::OligodonArnensis => (
                "Banded Kukri Snake",
                "कुक्रे सर्प (Kukre Sarpa)",
                NonVenomous,
                "Agricultural lands, forests",
            ),
            Species::OphiophagusHannah => (
                "King Cobra",
                "राज गोमन (Raj Goman), Kalinag, Kenwata",
                HighlyVenomous,
                "Rainforests",
            ),
            Species::OreocryptophisPorphyraceus => (
                "Beautiful Rat Snake",
                "रङ्गीचङ्गी धामन (Rangichangi Dhaman)",
                NonVenomous,
                "Mountain forests",
            ),
            Species::OvophisMonticola => (
                "Mountain Pit Viper",
                "अंध सर्प (Andho Sarpa), Gurube, Chhirbire Sarpa",
                Venomous,
                "Montane forests",
            ),
            Species::PtyasMucosa => (
                "Indian Rat Snake",
                "धामन (Dhaman)",
                NonVenomous,
                "Fields, forests, human settlements",
            ),
            Species::PythonMolurus => (
                "Indian Rock Python",
                "अजिंगर (Ajingara)",
                NonVenomous,
                "Forests, grasslands",
            ),
            Species::RhabdophisSubminiatus => (
                "Red-necked Keelback",
                "रातो घाँटी सर्प (Rato Ghati Sarpa)",
                MildlyVenomous,
                "Streams, wetlands, forests",
            ),
            Species::SibynophisSubpunctatus => (
                "Duméril’s Black-headed Snake",
                "कालो टाउको सर्प (Kalo Tauko Sarpa)",
                NonVenomous,
                "Forests, plantations",
            ),
            Species::XenochrophisPiscator => (
                "Checkered Keelback",
                "पानी सर्प (Pani Sarpa)",
                NonVenomous,
                "Wetlands, rivers",
            ),
        };

        SpeciesInfo {
            common_name,
            nepali_name,
            danger,
            habitat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_order_is_alphabetical() {
        let ids: Vec<&str> = Species::ALL.iter().map(|s| s.identifier()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_from_index() {
        assert_eq!(Species::from_index(0), Some(Species::AhaetullaNasuta));
        assert_eq!(Species::from_index(16), Some(Species::NajaNaja));
        assert_eq!(Species::from_index(25), Some(Species::XenochrophisPiscator));
        assert_eq!(Species::from_index(Species::COUNT), None);
    }

    #[test]
    fn test_info_lookup() {
        let info = Species::DaboiaRusselii.info();
        assert_eq!(info.common_name, "Russell's Viper");
        assert_eq!(info.danger, Hazard::HighlyVenomous);
    }

    #[test]
    fn test_hazard_serializes_as_label() {
        for (hazard, label) in [
            (Hazard::NonVenomous, "Non-venomous"),
            (Hazard::MildlyVenomous, "Mildly venomous"),
            (Hazard::Venomous, "Venomous"),
            (Hazard::HighlyVenomous, "Highly venomous"),
        ] {
            assert_eq!(serde_json::to_value(hazard).unwrap(), label);
        }
    }
}

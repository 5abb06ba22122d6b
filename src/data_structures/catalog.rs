//! Static tables describing every model the aquarium knows how to draw.
//!
//! A [`ModelName`] identifies a mesh file in the assets directory. Its
//! [`ModelInfo`] says which renderable kind it becomes, which shader program
//! draws it and whether it is fogged or blended. Each [`ProgramName`] lists the
//! vertex buffers and textures it binds, which is what a renderable object
//! checks when it is initialised.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelName {
    RuinColumn,
    Arch,
    RockA,
    RockB,
    RockC,
    SunknShipBoxes,
    SunknShipDeck,
    SunknShipHull,
    FloorBaseBaked,
    SunknSub,
    Coral,
    Stone,
    CoralStoneA,
    CoralStoneB,
    GlobeBase,
    TreasureChest,
    SupportBeams,
    // Fish are listed in species table order.
    SmallFishA,
    MediumFishA,
    MediumFishB,
    BigFishA,
    BigFishB,
    GlobeInner,
    SeaweedA,
    SeaweedB,
    EnvironmentBox,
}

impl ModelName {
    pub const ALL: [ModelName; 26] = [
        ModelName::RuinColumn,
        ModelName::Arch,
        ModelName::RockA,
        ModelName::RockB,
        ModelName::RockC,
        ModelName::SunknShipBoxes,
        ModelName::SunknShipDeck,
        ModelName::SunknShipHull,
        ModelName::FloorBaseBaked,
        ModelName::SunknSub,
        ModelName::Coral,
        ModelName::Stone,
        ModelName::CoralStoneA,
        ModelName::CoralStoneB,
        ModelName::GlobeBase,
        ModelName::TreasureChest,
        ModelName::SupportBeams,
        ModelName::SmallFishA,
        ModelName::MediumFishA,
        ModelName::MediumFishB,
        ModelName::BigFishA,
        ModelName::BigFishB,
        ModelName::GlobeInner,
        ModelName::SeaweedA,
        ModelName::SeaweedB,
        ModelName::EnvironmentBox,
    ];

    /// The name used for the model's file and in placement records.
    pub fn file_stem(self) -> &'static str {
        match self {
            ModelName::RuinColumn => "RuinColumn",
            ModelName::Arch => "Arch",
            ModelName::RockA => "RockA",
            ModelName::RockB => "RockB",
            ModelName::RockC => "RockC",
            ModelName::SunknShipBoxes => "SunknShipBoxes",
            ModelName::SunknShipDeck => "SunknShipDeck",
            ModelName::SunknShipHull => "SunknShipHull",
            ModelName::FloorBaseBaked => "FloorBase_Baked",
            ModelName::SunknSub => "SunknSub",
            ModelName::Coral => "Coral",
            ModelName::Stone => "Stone",
            ModelName::CoralStoneA => "CoralStoneA",
            ModelName::CoralStoneB => "CoralStoneB",
            ModelName::GlobeBase => "GlobeBase",
            ModelName::TreasureChest => "TreasureChest",
            ModelName::SupportBeams => "SupportBeams",
            ModelName::SmallFishA => "SmallFishA",
            ModelName::MediumFishA => "MediumFishA",
            ModelName::MediumFishB => "MediumFishB",
            ModelName::BigFishA => "BigFishA",
            ModelName::BigFishB => "BigFishB",
            ModelName::GlobeInner => "GlobeInner",
            ModelName::SeaweedA => "SeaweedA",
            ModelName::SeaweedB => "SeaweedB",
            ModelName::EnvironmentBox => "EnvironmentBox",
        }
    }

    pub fn from_file_stem(stem: &str) -> Option<ModelName> {
        ModelName::ALL
            .into_iter()
            .find(|name| name.file_stem() == stem)
    }

    pub fn info(self) -> ModelInfo {
        let (group, program, fog, blend) = match self {
            ModelName::Arch
            | ModelName::RockA
            | ModelName::RockB
            | ModelName::RockC
            | ModelName::CoralStoneA
            | ModelName::CoralStoneB
            | ModelName::SunknShipHull => {
                (ModelGroup::Generic, ProgramName::NormalMap, true, false)
            }
            ModelName::RuinColumn
            | ModelName::SunknShipBoxes
            | ModelName::SunknShipDeck
            | ModelName::FloorBaseBaked
            | ModelName::SunknSub
            | ModelName::Coral
            | ModelName::Stone
            | ModelName::GlobeBase
            | ModelName::TreasureChest
            | ModelName::SupportBeams => (ModelGroup::Generic, ProgramName::Diffuse, true, false),
            ModelName::SmallFishA
            | ModelName::MediumFishA
            | ModelName::MediumFishB
            | ModelName::BigFishA
            | ModelName::BigFishB => (ModelGroup::Fish, ProgramName::Fish, true, false),
            ModelName::GlobeInner => (ModelGroup::Inner, ProgramName::Inner, true, false),
            ModelName::SeaweedA | ModelName::SeaweedB => {
                (ModelGroup::Seaweed, ProgramName::Seaweed, true, true)
            }
            ModelName::EnvironmentBox => (ModelGroup::Outside, ProgramName::Diffuse, false, false),
        };
        ModelInfo {
            name: self,
            group,
            program,
            fog,
            blend,
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// Draw groups, in the order they are drawn every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelGroup {
    Generic,
    Fish,
    Inner,
    Seaweed,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: ModelName,
    pub group: ModelGroup,
    pub program: ProgramName,
    pub fog: bool,
    pub blend: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferName {
    Position,
    Normal,
    TexCoord,
    Tangent,
    Binormal,
    Indices,
}

impl BufferName {
    pub const VERTEX: [BufferName; 5] = [
        BufferName::Position,
        BufferName::Normal,
        BufferName::TexCoord,
        BufferName::Tangent,
        BufferName::Binormal,
    ];

    /// Key of the field in a model file.
    pub fn key(self) -> &'static str {
        match self {
            BufferName::Position => "position",
            BufferName::Normal => "normal",
            BufferName::TexCoord => "texCoord",
            BufferName::Tangent => "tangent",
            BufferName::Binormal => "binormal",
            BufferName::Indices => "indices",
        }
    }

    pub fn from_key(key: &str) -> Option<BufferName> {
        BufferName::VERTEX
            .into_iter()
            .chain([BufferName::Indices])
            .find(|name| name.key() == key)
    }

    /// Shader location of the vertex attribute fed by this buffer.
    pub fn location(self) -> Option<u32> {
        match self {
            BufferName::Position => Some(0),
            BufferName::Normal => Some(1),
            BufferName::TexCoord => Some(2),
            BufferName::Tangent => Some(3),
            BufferName::Binormal => Some(4),
            BufferName::Indices => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    NormalMap,
    ReflectionMap,
    Skybox,
}

impl TextureSlot {
    pub fn key(self) -> &'static str {
        match self {
            TextureSlot::Diffuse => "diffuse",
            TextureSlot::NormalMap => "normalMap",
            TextureSlot::ReflectionMap => "reflectionMap",
            TextureSlot::Skybox => "skybox",
        }
    }

    pub fn from_key(key: &str) -> Option<TextureSlot> {
        [
            TextureSlot::Diffuse,
            TextureSlot::NormalMap,
            TextureSlot::ReflectionMap,
            TextureSlot::Skybox,
        ]
        .into_iter()
        .find(|slot| slot.key() == key)
    }

    /// Colour data is sampled as sRGB; normal maps are not.
    pub fn is_srgb(self) -> bool {
        !matches!(self, TextureSlot::NormalMap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgramName {
    Diffuse,
    NormalMap,
    Fish,
    Inner,
    Seaweed,
}

impl ProgramName {
    /// Stem of the program's `.vert.wgsl` / `.frag.wgsl` pair.
    pub fn file_stem(self) -> &'static str {
        match self {
            ProgramName::Diffuse => "diffuse",
            ProgramName::NormalMap => "normal_map",
            ProgramName::Fish => "fish",
            ProgramName::Inner => "inner",
            ProgramName::Seaweed => "seaweed",
        }
    }

    /// Vertex buffers in vertex-buffer-slot order. Indices are always required.
    pub fn vertex_buffers(self) -> &'static [BufferName] {
        match self {
            ProgramName::Diffuse | ProgramName::Seaweed => &[
                BufferName::Position,
                BufferName::Normal,
                BufferName::TexCoord,
            ],
            ProgramName::NormalMap | ProgramName::Fish | ProgramName::Inner => &[
                BufferName::Position,
                BufferName::Normal,
                BufferName::TexCoord,
                BufferName::Tangent,
                BufferName::Binormal,
            ],
        }
    }

    /// Textures in binding order.
    pub fn textures(self) -> &'static [TextureSlot] {
        match self {
            ProgramName::Diffuse | ProgramName::Seaweed => &[TextureSlot::Diffuse],
            ProgramName::NormalMap => &[TextureSlot::Diffuse, TextureSlot::NormalMap],
            ProgramName::Fish => &[
                TextureSlot::Diffuse,
                TextureSlot::NormalMap,
                TextureSlot::ReflectionMap,
            ],
            ProgramName::Inner => &[
                TextureSlot::Diffuse,
                TextureSlot::NormalMap,
                TextureSlot::ReflectionMap,
                TextureSlot::Skybox,
            ],
        }
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! The reference plant every integration suite runs against.
//!
//! ```text
//! Objects
//! ├── Plant (Folder)
//! │   ├── P1 (PumpType)
//! │   │   ├── Speed
//! │   │   │   └── Unit (property)
//! │   │   ├── Temperature
//! │   │   ├── Motor (BaseObjectType)
//! │   │   │   └── Current
//! │   │   └── Start(Delay) / Scale(Value, Factor = 2.0)
//! │   ├── P2 (PumpType)
//! │   ├── B1 (BoosterPumpType, subtype of PumpType)
//! │   │   └── Stage (PumpType)
//! │   │       └── Speed
//! │   └── V1 (ValveType)
//! │       └── Position
//! ├── Values (Folder)          one variable per built-in type
//! └── Large (Folder)           LARGE_FOLDER_SIZE variables
//! ```

use std::sync::Arc;

use serde_json::json;
use uapub_nodes::client::Argument;
use uapub_nodes::types::reference_types;
use uapub_nodes::{
    AddressSpace, Connection, ExpandedNodeId, ExtensionObject, LocalizedText, MemorySession,
    NodeClass, NodeId, OpcUaDataType, QualifiedName, StatusCode, Variant,
};

/// Namespace of the plant nodes.
pub const PLANT_NS: &str = "http://test.org/Plant/";

/// Endpoint used by fixture entries.
pub const PLANT_ENDPOINT: &str = "opc.tcp://plant.test:4840";

/// Number of variables below the `Large` folder.
pub const LARGE_FOLDER_SIZE: usize = 600;

/// Pump instances of `PumpType` and its subtypes directly below `Plant`.
pub const PUMPS: [&str; 3] = ["P1", "P2", "B1"];

// =============================================================================
// Node ids
// =============================================================================

/// Absolute id of a plant node.
pub fn plant_id(name: &str) -> String {
    format!("{}#s={}", PLANT_NS, name)
}

/// Browse path element naming a plant node.
pub fn plant_name(name: &str) -> String {
    format!("{}#{}", PLANT_NS, name)
}

// =============================================================================
// Address space
// =============================================================================

/// Builds the reference plant.
pub fn plant_space() -> AddressSpace {
    let mut space = AddressSpace::with_standard_nodes();
    let ns = space.register_namespace(PLANT_NS);
    let id = |name: &str| NodeId::string(ns, name);
    let name = |name: &str| QualifiedName::new(ns, name);

    // Types
    space.add_type(id("PumpType"), NodeClass::ObjectType, name("PumpType"), &NodeId::BASE_OBJECT_TYPE);
    space.add_type(
        id("BoosterPumpType"),
        NodeClass::ObjectType,
        name("BoosterPumpType"),
        &id("PumpType"),
    );
    space.add_type(id("ValveType"), NodeClass::ObjectType, name("ValveType"), &NodeId::BASE_OBJECT_TYPE);
    space.add_type(id("TankType"), NodeClass::ObjectType, name("TankType"), &NodeId::BASE_OBJECT_TYPE);

    // Plant
    let plant = id("Plant");
    space.add_folder(plant.clone(), name("Plant"), &NodeId::OBJECTS_FOLDER);
    for (pump, type_name) in [("P1", "PumpType"), ("P2", "PumpType"), ("B1", "BoosterPumpType")] {
        space.add_object(id(pump), name(pump), &plant, &reference_types::ORGANIZES, &id(type_name));
        for (variable, value) in [("Speed", 1450.0), ("Temperature", 41.5)] {
            space.add_variable(
                id(&format!("{}.{}", pump, variable)),
                name(variable),
                &id(pump),
                OpcUaDataType::Double,
                Variant::Double(value),
            );
        }
    }

    space.add_property(
        id("P1.Speed.Unit"),
        name("Unit"),
        &id("P1.Speed"),
        OpcUaDataType::String,
        Variant::String("rpm".into()),
    );

    // a pump nested in a pump
    space.add_object(
        id("B1.Stage"),
        name("Stage"),
        &id("B1"),
        &reference_types::HAS_COMPONENT,
        &id("PumpType"),
    );
    space.add_variable(
        id("B1.Stage.Speed"),
        name("Speed"),
        &id("B1.Stage"),
        OpcUaDataType::Double,
        Variant::Double(2900.0),
    );

    let motor = id("P1.Motor");
    space.add_object(
        motor.clone(),
        name("Motor"),
        &id("P1"),
        &reference_types::HAS_COMPONENT,
        &NodeId::BASE_OBJECT_TYPE,
    );
    space.add_variable(
        id("P1.Motor.Current"),
        name("Current"),
        &motor,
        OpcUaDataType::Double,
        Variant::Double(3.2),
    );
    space.add_property(
        id("P1.SerialNumber"),
        name("SerialNumber"),
        &id("P1"),
        OpcUaDataType::String,
        Variant::String("SN-0001".into()),
    );
    space.add_method(
        id("P1.Start"),
        name("Start"),
        &id("P1"),
        vec![Argument::new("Delay", OpcUaDataType::UInt32.node_id())],
        Vec::new(),
    );
    space.add_method(
        id("P1.Scale"),
        name("Scale"),
        &id("P1"),
        vec![
            Argument::new("Value", OpcUaDataType::Double.node_id()),
            Argument::new("Factor", OpcUaDataType::Double.node_id()).with_default(json!(2.0)),
        ],
        vec![
            Argument::new("Result", OpcUaDataType::Double.node_id()),
            Argument::new("Unit", OpcUaDataType::String.node_id()).with_default(json!("rpm")),
        ],
    );

    space.add_object(id("V1"), name("V1"), &plant, &reference_types::ORGANIZES, &id("ValveType"));
    space.add_variable(
        id("V1.Position"),
        name("Position"),
        &id("V1"),
        OpcUaDataType::Int32,
        Variant::Int32(50),
    );

    // Values
    let values = id("Values");
    space.add_folder(values.clone(), name("Values"), &NodeId::OBJECTS_FOLDER);
    for (variable, data_type, value) in builtin_values(ns) {
        space.add_variable(id(&format!("Values.{}", variable)), name(variable), &values, data_type, value);
    }

    // Large
    let large = id("Large");
    space.add_folder(large.clone(), name("Large"), &NodeId::OBJECTS_FOLDER);
    for i in 0..LARGE_FOLDER_SIZE {
        space.add_variable(
            id(&format!("Large.{:04}", i)),
            name(&format!("Item{:04}", i)),
            &large,
            OpcUaDataType::UInt32,
            Variant::UInt32(i as u32),
        );
    }

    space
}

/// One sample value per built-in type, keyed by variable name.
///
/// Values are chosen so that they survive the JSON encoding unchanged.
pub fn builtin_values(ns: u16) -> Vec<(&'static str, OpcUaDataType, Variant)> {
    let timestamp: chrono::DateTime<chrono::Utc> = "2025-03-14T09:26:53Z"
        .parse()
        .expect("valid fixture timestamp");
    let guid = uuid::Uuid::parse_str("72962b91-fa75-4ae6-8d28-b404dc7daf63")
        .expect("valid fixture guid");
    vec![
        ("Boolean", OpcUaDataType::Boolean, Variant::Boolean(true)),
        ("SByte", OpcUaDataType::SByte, Variant::SByte(-12)),
        ("Byte", OpcUaDataType::Byte, Variant::Byte(200)),
        ("Int16", OpcUaDataType::Int16, Variant::Int16(-3000)),
        ("UInt16", OpcUaDataType::UInt16, Variant::UInt16(60000)),
        ("Int32", OpcUaDataType::Int32, Variant::Int32(-100_000)),
        ("UInt32", OpcUaDataType::UInt32, Variant::UInt32(4_000_000_000)),
        ("Int64", OpcUaDataType::Int64, Variant::Int64(-9_000_000_000)),
        ("UInt64", OpcUaDataType::UInt64, Variant::UInt64(18_000_000_000)),
        ("Float", OpcUaDataType::Float, Variant::Float(2.5)),
        ("Double", OpcUaDataType::Double, Variant::Double(-1234.5)),
        ("String", OpcUaDataType::String, Variant::String("héllo wörld".into())),
        ("DateTime", OpcUaDataType::DateTime, Variant::DateTime(timestamp)),
        ("Guid", OpcUaDataType::Guid, Variant::Guid(guid)),
        ("ByteString", OpcUaDataType::ByteString, Variant::ByteString(vec![0, 1, 2, 254, 255])),
        (
            "XmlElement",
            OpcUaDataType::XmlElement,
            Variant::XmlElement("<Pump id=\"P1\"><Stage>2</Stage></Pump>".into()),
        ),
        (
            "NodeId",
            OpcUaDataType::NodeId,
            Variant::from(NodeId::string(ns, "P1")),
        ),
        (
            "ExpandedNodeId",
            OpcUaDataType::ExpandedNodeId,
            Variant::ExpandedNodeId(Box::new(ExpandedNodeId {
                node_id: NodeId::string(0, "Line.Speed"),
                namespace_uri: Some("urn:remote:line".into()),
                server_index: 0,
            })),
        ),
        (
            "QualifiedName",
            OpcUaDataType::QualifiedName,
            Variant::from(QualifiedName::new(ns, "Speed")),
        ),
        (
            "LocalizedText",
            OpcUaDataType::LocalizedText,
            Variant::from(LocalizedText::with_locale("en-US", "Pump")),
        ),
        (
            "StatusCode",
            OpcUaDataType::StatusCode,
            Variant::StatusCode(StatusCode::BAD_NOT_READABLE),
        ),
        (
            "ExtensionObject",
            OpcUaDataType::ExtensionObject,
            Variant::from(ExtensionObject::new(
                NodeId::numeric(0, 884),
                json!({ "Low": 0.5, "High": 3000.5 }),
            )),
        ),
        // enumerations travel as their Int32 value
        ("Enumeration", OpcUaDataType::Enumeration, Variant::Int32(2)),
        // abstract declared types carry the concrete type with the value
        ("Number", OpcUaDataType::Number, Variant::Double(3.5)),
        ("Integer", OpcUaDataType::Integer, Variant::Int64(-42)),
        ("UInteger", OpcUaDataType::UInteger, Variant::UInt16(7)),
        (
            "Int32Array",
            OpcUaDataType::Int32,
            Variant::array(OpcUaDataType::Int32, (1..=4).map(Variant::Int32).collect()),
        ),
        (
            "StringArray",
            OpcUaDataType::String,
            Variant::array(
                OpcUaDataType::String,
                vec![Variant::String("a".into()), Variant::String("b".into())],
            ),
        ),
    ]
}

/// Names of the variables below the `Values` folder.
pub fn builtin_value_names() -> Vec<&'static str> {
    builtin_values(1).into_iter().map(|(name, _, _)| name).collect()
}

// =============================================================================
// Sessions
// =============================================================================

/// A session over the plant with the method implementations registered.
pub fn plant_session() -> MemorySession {
    let session = MemorySession::new(plant_space());
    register_methods(&session);
    session
}

/// A session over the plant returning at most `page_size` references per
/// browse.
pub fn paged_plant_session(page_size: usize) -> MemorySession {
    let session = MemorySession::new(plant_space()).with_max_references_per_node(page_size);
    register_methods(&session);
    session
}

/// The plant session as a connection.
pub fn plant_connection() -> Connection {
    Arc::new(plant_session())
}

fn register_methods(session: &MemorySession) {
    let ns = session
        .read_space(|space| space.namespaces().index_of(PLANT_NS))
        .unwrap_or(1);
    session.register_method(NodeId::string(ns, "P1.Start"), |_inputs: &[Variant]| Ok(Vec::new()));
    session.register_method(NodeId::string(ns, "P1.Scale"), |inputs: &[Variant]| {
        let value = inputs.first().and_then(Variant::as_f64).unwrap_or_default();
        let factor = inputs.get(1).and_then(Variant::as_f64).unwrap_or(1.0);
        Ok(vec![Variant::Double(value * factor), Variant::Empty])
    });
}

// =============================================================================
// Files
// =============================================================================

/// A published nodes file with one entry per pump and one type entry.
pub fn published_nodes_json() -> String {
    serde_json::to_string_pretty(&json!([
        {
            "EndpointUrl": PLANT_ENDPOINT,
            "DataSetWriterGroup": "Pumps",
            "OpcNodes": [
                { "Id": plant_id("P1"), "DataSetFieldId": "P1" },
                { "Id": plant_id("P2"), "DataSetFieldId": "P2" }
            ]
        },
        {
            "EndpointUrl": PLANT_ENDPOINT,
            "DataSetWriterGroup": "Types",
            "OpcNodes": [
                { "Id": plant_id("PumpType"), "DataSetFieldId": "Pump" }
            ]
        }
    ]))
    .expect("fixture serializes")
}

/// A small address space snapshot in YAML.
pub fn address_space_yaml() -> String {
    format!(
        r#"
namespaces: ["{ns}"]
nodes:
  - nodeId: "nsu={ns};s=Line"
    nodeClass: Object
    browseName: "1:Line"
    parent: "i=85"
    typeDefinition: "i=58"
  - nodeId: "nsu={ns};s=Line.Speed"
    nodeClass: Variable
    browseName: "1:Speed"
    parent: "nsu={ns};s=Line"
    dataType: Double
    value: 12.5
    accessLevel: 3
"#,
        ns = PLANT_NS
    )
}

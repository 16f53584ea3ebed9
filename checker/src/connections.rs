// connections.rs: Connection legality across graph modules
//
// Resolves both ends of every connection (instance → module → endpoint),
// checks explicit indices, endpoint kinds and finally asks the
// compatibility oracle whether the data types can flow.
//
// Multiplicity of a side is 1 when it addresses a specific endpoint index or
// the graph's own I/O, and the instance's array size otherwise (the
// connection fans out to or in from every copy).
//
// Preconditions: none; every reference is resolved and reported here.
// Postconditions: every connection of every graph names existing, compatible
//   endpoints.
// Failure modes: `UnknownProcessor`, `UnknownEndpoint`,
//   `EndpointIndexOutOfRange`, `IncompatibleEndpointKinds`,
//   `IncompatibleConnectionTypes`. Source side is always checked first.
// Side effects: debug logging only.

use crate::diag::{CheckResult, Diagnostic, ErrorKind, Side};
use crate::ir::{Connection, EndpointRef, IoDeclaration, Module, Program};
use crate::types::{Equality, Type, TypeRules};

// ── Compatibility oracle ──

/// Can `source` feed `dest`?
///
/// Events compare cardinality (multiplicity times array size; 1 fans in or
/// out freely) and need one source type castable to one destination type.
/// Streams and values compare their frame types, ignoring a vector width of
/// 1, and allow a scalar to feed an array of the same element (or vice versa).
pub fn are_connection_types_compatible(
    rules: &dyn TypeRules,
    is_event: bool,
    source: &IoDeclaration,
    source_multiplicity: u32,
    dest: &IoDeclaration,
    dest_multiplicity: u32,
) -> bool {
    if is_event {
        // u32 x u32 always fits in u64.
        let source_size = u64::from(source_multiplicity) * u64::from(source.array_size.unwrap_or(1));
        let dest_size = u64::from(dest_multiplicity) * u64::from(dest.array_size.unwrap_or(1));
        if source_size != 1 && dest_size != 1 && source_size != dest_size {
            return false;
        }
        return source.data_types.iter().any(|s| {
            dest.data_types
                .iter()
                .any(|d| rules.can_silently_cast_to(d, s))
        });
    }

    let (Some(s), Some(d)) = (source.frame_or_value_type(), dest.frame_or_value_type()) else {
        return false;
    };
    let same = |a: &Type, b: &Type| rules.is_equal(a, b, Equality::IgnoreVectorSize1);
    same(s, d)
        || s.element_type().is_some_and(|e| same(e, d))
        || d.element_type().is_some_and(|e| same(s, e))
}

// ── Resolution ──

struct Resolved<'p> {
    decl: &'p IoDeclaration,
    multiplicity: u32,
    name: String,
}

fn endpoint_description(side: Side, endpoint: &EndpointRef) -> String {
    format!("{} endpoint '{}'", side.name(), endpoint.description())
}

/// The module instantiated by the side's processor instance, with the
/// side's multiplicity. `None` means the graph's own I/O.
fn resolve_instance<'p>(
    program: &'p Program,
    graph: &'p Module,
    connection: &Connection,
    endpoint: &EndpointRef,
) -> CheckResult<Option<(&'p Module, u32)>> {
    let Some(instance_name) = &endpoint.processor else {
        return Ok(None);
    };
    let Some(instance) = graph.find_instance(instance_name) else {
        return Diagnostic::new(
            ErrorKind::UnknownProcessor,
            connection.span,
            format!(
                "cannot find processor instance '{}' in graph '{}'",
                instance_name, graph.name
            ),
        )
        .fail();
    };
    let Some(module) = program.find_module(&instance.module) else {
        return Diagnostic::new(
            ErrorKind::UnknownProcessor,
            instance.span,
            format!(
                "cannot find processor '{}' for instance '{}'",
                instance.module, instance.name
            ),
        )
        .fail();
    };
    let multiplicity = if endpoint.index.is_some() {
        1
    } else {
        instance.array_size
    };
    Ok(Some((module, multiplicity)))
}

fn resolve_endpoint<'p>(
    graph: &'p Module,
    instance: Option<(&'p Module, u32)>,
    connection: &Connection,
    endpoint: &EndpointRef,
    side: Side,
) -> CheckResult<Resolved<'p>> {
    let (decl, multiplicity) = match (instance, side) {
        (Some((module, m)), Side::Source) => (module.find_output(&endpoint.endpoint), m),
        (Some((module, m)), Side::Destination) => (module.find_input(&endpoint.endpoint), m),
        (None, Side::Source) => (graph.find_input(&endpoint.endpoint), 1),
        (None, Side::Destination) => (graph.find_output(&endpoint.endpoint), 1),
    };
    match decl {
        Some(decl) => Ok(Resolved {
            decl,
            multiplicity,
            name: endpoint.description(),
        }),
        None => Diagnostic::new(
            ErrorKind::UnknownEndpoint(side),
            connection.span,
            format!("cannot find {}", endpoint_description(side, endpoint)),
        )
        .fail(),
    }
}

fn check_index(
    resolved: &Resolved<'_>,
    connection: &Connection,
    endpoint: &EndpointRef,
    side: Side,
) -> CheckResult<()> {
    let Some(index) = endpoint.index else {
        return Ok(());
    };
    if index < resolved.decl.array_size.unwrap_or(0) {
        return Ok(());
    }
    let diag = Diagnostic::new(
        ErrorKind::EndpointIndexOutOfRange(side),
        connection.span,
        format!(
            "index {} is out of range for {}",
            index,
            endpoint_description(side, endpoint)
        ),
    )
    .with_related(resolved.decl.span, format!("'{}' declared here", resolved.decl.name));
    let diag = match resolved.decl.array_size {
        Some(size) if size > 0 => diag.with_hint(format!("valid indices are 0 to {}", size - 1)),
        _ => diag.with_hint("only array endpoints can be indexed"),
    };
    diag.fail()
}

// ── Legality ──

/// Check one connection of `graph`.
pub fn check_connection(
    program: &Program,
    graph: &Module,
    connection: &Connection,
    rules: &dyn TypeRules,
) -> CheckResult<()> {
    let source_instance = resolve_instance(program, graph, connection, &connection.source)?;
    let dest_instance = resolve_instance(program, graph, connection, &connection.dest)?;

    let source = resolve_endpoint(graph, source_instance, connection, &connection.source, Side::Source)?;
    let dest = resolve_endpoint(graph, dest_instance, connection, &connection.dest, Side::Destination)?;

    check_index(&source, connection, &connection.source, Side::Source)?;
    check_index(&dest, connection, &connection.dest, Side::Destination)?;

    if source.decl.kind != dest.decl.kind {
        return Diagnostic::new(
            ErrorKind::IncompatibleEndpointKinds,
            connection.span,
            format!(
                "cannot connect {} '{}' to {} '{}'",
                source.decl.kind.name(),
                source.name,
                dest.decl.kind.name(),
                dest.name
            ),
        )
        .fail();
    }

    if !are_connection_types_compatible(
        rules,
        source.decl.is_event(),
        source.decl,
        source.multiplicity,
        dest.decl,
        dest.multiplicity,
    ) {
        return Diagnostic::new(
            ErrorKind::IncompatibleConnectionTypes,
            connection.span,
            format!(
                "cannot connect '{}' ({}) to '{}' ({})",
                source.name,
                source.decl.types_description(),
                dest.name,
                dest.decl.types_description()
            ),
        )
        .fail();
    }

    Ok(())
}

/// Check every connection of every graph module, in declaration order.
pub fn check_connections(program: &Program, rules: &dyn TypeRules) -> CheckResult<()> {
    for graph in program.modules.iter().filter(|m| m.is_graph()) {
        log::debug!(
            "graph '{}': checking {} connections",
            graph.name,
            graph.connections.len()
        );
        for connection in &graph.connections {
            check_connection(program, graph, connection, rules)?;
        }
    }
    Ok(())
}

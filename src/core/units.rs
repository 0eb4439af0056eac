//! SET unit-of-measure code validation (Anexo "Unidades de Medida").
//!
//! SIFEN line items carry a numeric unit code (`cUniMed`) drawn from SET's
//! published table rather than UN/CEFACT Rec 20. This covers the subset in
//! common commercial use; the full table has several hundred entries.

/// Check whether `code` is a known SET unit-of-measure code.
pub fn is_known_unit_code(code: &str) -> bool {
    UNIT_CODES.binary_search(&code).is_ok()
}

/// Sorted list of common SET unit-of-measure codes.
/// Sorted for binary search.
static UNIT_CODES: &[&str] = &[
    "110", // día
    "111", // mes
    "112", // año
    "2",   // kg
    "25",  // caja
    "26",  // docena
    "27",  // par
    "3",   // tonelada
    "4",   // metro
    "41",  // metro cuadrado
    "42",  // metro cúbico
    "5",   // litro
    "56",  // hora
    "6",   // mililitro
    "7",   // centímetro
    "77",  // unidad
    "8",   // kilómetro
    "89",  // paquete
];

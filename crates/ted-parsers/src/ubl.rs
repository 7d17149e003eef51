//! eForms UBL ContractAwardNotice parser (2025+).
//!
//! Award data lives under `efac:NoticeResult` as a set of sibling elements
//! cross-referenced by ID (`LotResult` -> `LotTender` -> `TenderingParty` ->
//! `Tenderer` org IDs, and `LotResult` -> `SettledContract`), rather than
//! nested the way the legacy dialect nests contractors under each award.
//! The lookup maps built here mirror that reference graph directly.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use roxmltree::Node;

use ted_core::error::Result;
use ted_core::{normalize_contract_nature, normalize_procedure_type};
use ted_core::{parse_optional_int, CodelistEntry, Identifier, Organization};
use ted_core::{Award, Contract, Document, Notice};

use crate::monetary_value;
use crate::xml::{attr, find, find_all, find_child, text};

const CAC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
const EFAC: &str = "http://data.europa.eu/p27/eforms-ubl-extension-aggregate-components/1";
const EFBC: &str = "http://data.europa.eu/p27/eforms-ubl-extension-basic-components/1";

/// Placeholder award dates such as `2000-01-01` appear when the field is
/// technically present but not meaningfully populated; years before this
/// cutoff are treated as absent. Kept as a parameter-shaped constant rather
/// than baked into the date parser itself, since different archives could
/// plausibly want a different cutoff.
const AWARD_DATE_PLACEHOLDER_CUTOFF_YEAR: i32 = 2005;

fn parse_date_eforms(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() < 10 {
        return None;
    }
    let (date_part, rest) = s.split_at(10);
    if rest.is_empty() {
        return None;
    }
    let valid_suffix = rest == "Z"
        || ((rest.starts_with('+') || rest.starts_with('-'))
            && rest.len() == 6
            && rest.as_bytes()[3] == b':');
    if !valid_suffix {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub fn parse(root: Node, fallback_doc_id: &str) -> Result<Option<Notice>> {
    let Some(document) = extract_document(root, fallback_doc_id) else {
        return Ok(None);
    };
    let Some((buyer, contact)) = extract_buyer(root) else {
        return Ok(None);
    };
    let mut document = document;
    document.phone = contact.0;
    document.email = contact.1;
    document.url_general = contact.2;

    let Some(contract) = extract_contract(root) else {
        return Ok(None);
    };

    let awards = extract_awards(root);
    if awards.is_empty() {
        return Ok(None);
    }

    Ok(Some(Notice {
        document,
        buyer,
        contract,
        awards,
    }))
}

fn extract_document(root: Node, fallback_doc_id: &str) -> Option<Document> {
    let pub_date_text = text(find(root, "PublicationDate", Some(EFBC)))
        .or_else(|| text(find(root, "IssueDate", Some(CBC))))?;
    let publication_date = parse_date_eforms(&pub_date_text)?;

    let doc_id = fallback_doc_id.replacen('_', "-", 1);
    let year = publication_date.year();
    let day_of_year = publication_date.ordinal();
    let official_ref = format!("{year}/S {day_of_year:03}-{doc_id}");

    let source_country = find(root, "Country", Some(CAC))
        .and_then(|e| find_child(e, "IdentificationCode", Some(CBC)))
        .and_then(|e| text(Some(e)));

    Some(Document {
        doc_id,
        edition: Some(format!("{year}{day_of_year:03}")),
        version: Some("eForms-UBL".to_string()),
        official_journal_ref: Some(official_ref),
        publication_date: Some(publication_date),
        dispatch_date: Some(publication_date),
        source_country,
        ..Default::default()
    })
}

type ContactFields = (Option<String>, Option<String>, Option<String>);

fn extract_buyer(root: Node) -> Option<(Organization, ContactFields)> {
    let contracting_party_id = find(root, "ContractingParty", Some(CAC))
        .and_then(|p| find(p, "Party", Some(CAC)))
        .and_then(|p| find(p, "PartyIdentification", Some(CAC)))
        .and_then(|p| find_child(p, "ID", Some(CBC)))
        .and_then(|e| text(Some(e)));

    let orgs = find_all(root, "Organization", Some(EFAC));
    let company = match &contracting_party_id {
        None => orgs.first().and_then(|o| find(*o, "Company", Some(EFAC))),
        Some(wanted) => orgs.iter().find_map(|o| {
            let company = find(*o, "Company", Some(EFAC))?;
            let org_id = company_id(company)?;
            (&org_id == wanted).then_some(company)
        }),
    }?;

    company_to_organization(company).map(|org| {
        let contact = (
            text(find(company, "Telephone", Some(CBC))),
            text(find(company, "ElectronicMail", Some(CBC))),
            text(find(company, "WebsiteURI", Some(CBC))),
        );
        (org, contact)
    })
}

fn company_id(company: Node) -> Option<String> {
    find(company, "PartyIdentification", Some(CAC))
        .and_then(|e| find_child(e, "ID", Some(CBC)))
        .and_then(|e| text(Some(e)))
}

fn company_to_organization(company: Node) -> Option<Organization> {
    let official_name = find(company, "PartyName", Some(CAC))
        .and_then(|e| find_child(e, "Name", Some(CBC)))
        .and_then(|e| text(Some(e)))?;

    let address = find(company, "PostalAddress", Some(CAC));
    let country_code = address
        .and_then(|a| find(a, "Country", Some(CAC)))
        .and_then(|c| find_child(c, "IdentificationCode", Some(CBC)))
        .and_then(|e| text(Some(e)));

    let company_id_elem = find(company, "PartyLegalEntity", Some(CAC)).and_then(|e| find_child(e, "CompanyID", Some(CBC)));
    let identifiers = company_id_elem
        .and_then(|e| text(Some(e)))
        .map(|value| {
            vec![Identifier {
                scheme: attr(company_id_elem, "schemeName").map(str::to_string),
                value,
            }]
        })
        .unwrap_or_default();

    Some(Organization {
        official_name,
        address: address.and_then(|a| find_child(a, "StreetName", Some(CBC))).and_then(|e| text(Some(e))),
        town: address.and_then(|a| find_child(a, "CityName", Some(CBC))).and_then(|e| text(Some(e))),
        postal_code: address.and_then(|a| find_child(a, "PostalZone", Some(CBC))).and_then(|e| text(Some(e))),
        country_code,
        nuts_code: address.and_then(|a| find_child(a, "CountrySubentityCode", Some(CBC))).and_then(|e| text(Some(e))),
        identifiers,
    })
}

fn extract_contract(root: Node) -> Option<Contract> {
    let title = find(root, "SettledContract", Some(EFAC))
        .and_then(|e| find_child(e, "Title", Some(CBC)))
        .and_then(|e| text(Some(e)))
        .unwrap_or_default();

    let project = find_child(root, "ProcurementProject", Some(CAC));

    let main_code = project
        .and_then(|p| find_child(p, "MainCommodityClassification", Some(CAC)))
        .and_then(|e| find_child(e, "ItemClassificationCode", Some(CBC)))
        .and_then(|e| text(Some(e)));

    let mut cpv_codes = Vec::new();
    if let Some(code) = &main_code {
        cpv_codes.push(CodelistEntry::new(code.clone(), None));
    }
    if let Some(project) = project {
        for elem in find_all(project, "AdditionalCommodityClassification", Some(CAC)) {
            if let Some(code) = find_child(elem, "ItemClassificationCode", Some(CBC)).and_then(|e| text(Some(e))) {
                cpv_codes.push(CodelistEntry::new(code, None));
            }
        }
    }

    let nature_code = project
        .and_then(|p| find_child(p, "ProcurementTypeCode", Some(CBC)))
        .and_then(|e| text(Some(e)));

    let proc_code = find(root, "TenderingProcess", Some(CAC))
        .and_then(|e| find_child(e, "ProcedureCode", Some(CBC)))
        .and_then(|e| text(Some(e)));
    let (procedure_type, mut accelerated) = normalize_procedure_type(proc_code.as_deref(), None);

    if !accelerated {
        if let Some(reason) = find(root, "ProcessJustification", Some(CAC)).and_then(|e| find_child(e, "ProcessReasonCode", Some(CBC))) {
            if attr(Some(reason), "listName") == Some("accelerated-procedure") && text(Some(reason)).as_deref() == Some("true") {
                accelerated = true;
            }
        }
    }

    let nuts_code = find(root, "ProcurementProjectLot", Some(CAC))
        .and_then(|l| find(l, "RealizedLocation", Some(CAC)))
        .and_then(|l| find(l, "CountrySubentityCode", Some(CBC)))
        .and_then(|e| text(Some(e)));

    let est_val = find(root, "ProcurementProjectLot", Some(CAC))
        .and_then(|l| find(l, "RequestedTenderTotal", Some(CAC)))
        .and_then(|e| find_child(e, "EstimatedOverallContractAmount", Some(CBC)));
    let estimated_value = est_val.and_then(|e| text(Some(e))).and_then(|s| monetary_value(&s, "estimated_value"));
    let estimated_value_currency = attr(est_val, "currencyID").map(str::to_string);

    let framework_elem = find(root, "ProcurementProjectLot", Some(CAC)).and_then(|l| find(l, "ContractingSystemTypeCode", Some(CBC)));
    let framework_agreement = framework_elem
        .filter(|e| attr(Some(*e), "listName") == Some("framework-agreement"))
        .and_then(|e| text(Some(e)))
        .is_some_and(|v| v != "none");

    let eu_funded_elem = find(root, "ProcurementProjectLot", Some(CAC)).and_then(|l| find(l, "FundingProgramCode", Some(CBC)));
    let eu_funded = eu_funded_elem
        .filter(|e| attr(Some(*e), "listName") == Some("eu-funded"))
        .and_then(|e| text(Some(e)))
        .is_some_and(|v| v == "eu-funds");

    Some(Contract {
        title: title.clone(),
        short_description: Some(title),
        main_cpv_code: main_code.map(|c| CodelistEntry::new(c, None)),
        cpv_codes,
        nuts_code,
        contract_nature_code: normalize_contract_nature(nature_code.as_deref()),
        procedure_type,
        accelerated,
        estimated_value,
        estimated_value_currency,
        framework_agreement,
        eu_funded,
    })
}

fn extract_awards(root: Node) -> Vec<Award> {
    let mut org_lookup: HashMap<String, Node> = HashMap::new();
    for org in find_all(root, "Organization", Some(EFAC)) {
        if let Some(company) = find(org, "Company", Some(EFAC)) {
            if let Some(id) = company_id(company) {
                org_lookup.insert(id, company);
            }
        }
    }

    let notice_result = find(root, "NoticeResult", Some(EFAC));
    let Some(notice_result) = notice_result else {
        return Vec::new();
    };

    let mut lot_tenders: HashMap<String, Node> = HashMap::new();
    for lt in find_all(notice_result, "LotTender", Some(EFAC)) {
        if let Some(id) = find_child(lt, "ID", Some(CBC)).and_then(|e| text(Some(e))) {
            lot_tenders.insert(id, lt);
        }
    }

    let mut settled_contracts: HashMap<String, Node> = HashMap::new();
    for sc in find_all(notice_result, "SettledContract", Some(EFAC)) {
        if let Some(id) = find_child(sc, "ID", Some(CBC)).and_then(|e| text(Some(e))) {
            settled_contracts.insert(id, sc);
        }
    }

    let mut tendering_parties: HashMap<String, Node> = HashMap::new();
    for tp in find_all(notice_result, "TenderingParty", Some(EFAC)) {
        if let Some(id) = find_child(tp, "ID", Some(CBC)).and_then(|e| text(Some(e))) {
            tendering_parties.insert(id, tp);
        }
    }

    let mut lot_periods: HashMap<String, (Option<NaiveDate>, Option<NaiveDate>)> = HashMap::new();
    for lot in find_all(root, "ProcurementProjectLot", Some(CAC)) {
        let Some(lot_id) = find_child(lot, "ID", Some(CBC)).and_then(|e| text(Some(e))) else {
            continue;
        };
        let period = find(lot, "PlannedPeriod", Some(CAC));
        let start = period
            .and_then(|p| find_child(p, "StartDate", Some(CBC)))
            .and_then(|e| text(Some(e)))
            .and_then(|s| parse_date_eforms(&s));
        let end = period
            .and_then(|p| find_child(p, "EndDate", Some(CBC)))
            .and_then(|e| text(Some(e)))
            .and_then(|s| parse_date_eforms(&s));
        lot_periods.insert(lot_id, (start, end));
    }

    let award_date = find(root, "TenderResult", Some(CAC))
        .and_then(|e| find_child(e, "AwardDate", Some(CBC)))
        .and_then(|e| text(Some(e)))
        .and_then(|s| parse_date_eforms(&s))
        .filter(|d| d.year() >= AWARD_DATE_PLACEHOLDER_CUTOFF_YEAR);

    let mut awards = Vec::new();
    for lot_result in find_all(notice_result, "LotResult", Some(EFAC)) {
        let lot_number = find(lot_result, "TenderLot", Some(EFAC))
            .and_then(|e| find_child(e, "ID", Some(CBC)))
            .and_then(|e| text(Some(e)));

        let tender_id = find(lot_result, "LotTender", Some(EFAC))
            .and_then(|e| find_child(e, "ID", Some(CBC)))
            .and_then(|e| text(Some(e)));

        let mut awarded_value = None;
        let mut awarded_currency = None;
        let mut party_id = None;
        if let Some(tender_id) = &tender_id {
            if let Some(lot_tender) = lot_tenders.get(tender_id) {
                let amount = find(*lot_tender, "LegalMonetaryTotal", Some(CAC)).and_then(|e| find_child(e, "PayableAmount", Some(CBC)));
                if let Some(amount) = amount {
                    awarded_value = text(Some(amount)).and_then(|s| monetary_value(&s, "awarded_value"));
                    awarded_currency = attr(Some(amount), "currencyID").map(str::to_string);
                }
                party_id = find(*lot_tender, "TenderingParty", Some(EFAC))
                    .and_then(|e| find_child(e, "ID", Some(CBC)))
                    .and_then(|e| text(Some(e)));
            }
        }

        let contract_id = find(lot_result, "SettledContract", Some(EFAC))
            .and_then(|e| find_child(e, "ID", Some(CBC)))
            .and_then(|e| text(Some(e)));

        let mut award_title = None;
        let mut contract_number = None;
        if let Some(contract_id) = &contract_id {
            if let Some(sc) = settled_contracts.get(contract_id) {
                award_title = find_child(*sc, "Title", Some(CBC)).and_then(|e| text(Some(e)));
                contract_number = find(*sc, "ContractReference", Some(EFAC))
                    .and_then(|e| find_child(e, "ID", Some(CBC)))
                    .and_then(|e| text(Some(e)));
            }
        }

        let tenders_received = find_all(lot_result, "ReceivedSubmissionsStatistics", Some(EFAC))
            .into_iter()
            .find(|stats| text(find_child(*stats, "StatisticsCode", Some(EFBC))).as_deref() == Some("tenders"))
            .and_then(|stats| find_child(stats, "StatisticsNumeric", Some(EFBC)))
            .and_then(|e| text(Some(e)))
            .and_then(|s| parse_optional_int(&s, "tenders_received"));

        let mut contractors = Vec::new();
        if let Some(party_id) = &party_id {
            if let Some(tp) = tendering_parties.get(party_id) {
                for tenderer in find_all(*tp, "Tenderer", Some(EFAC)) {
                    if let Some(org_id) = find_child(tenderer, "ID", Some(CBC)).and_then(|e| text(Some(e))) {
                        if let Some(company) = org_lookup.get(&org_id) {
                            if let Some(org) = company_to_organization(*company) {
                                contractors.push(org);
                            }
                        }
                    }
                }
            }
        }

        let (contract_start_date, contract_end_date) = lot_number
            .as_ref()
            .and_then(|n| lot_periods.get(n))
            .copied()
            .unwrap_or((None, None));

        awards.push(Award {
            award_title,
            contract_number,
            awarded_value,
            awarded_value_currency: awarded_currency,
            tenders_received,
            award_date,
            lot_number,
            contract_start_date,
            contract_end_date,
            contractors,
        });
    }

    awards
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ContractAwardNotice
  xmlns="urn:oasis:names:specification:ubl:schema:xsd:ContractAwardNotice-2"
  xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
  xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2"
  xmlns:efac="http://data.europa.eu/p27/eforms-ubl-extension-aggregate-components/1"
  xmlns:efbc="http://data.europa.eu/p27/eforms-ubl-extension-basic-components/1">
  <cbc:IssueDate>2024-12-30Z</cbc:IssueDate>
  <cac:ContractingParty>
    <cac:Party>
      <cac:PartyIdentification><cbc:ID>ORG-0001</cbc:ID></cac:PartyIdentification>
    </cac:Party>
  </cac:ContractingParty>
  <cac:ProcurementProject>
    <cac:MainCommodityClassification><cbc:ItemClassificationCode>45000000</cbc:ItemClassificationCode></cac:MainCommodityClassification>
  </cac:ProcurementProject>
  <efac:Organizations>
    <efac:Organization>
      <efac:Company>
        <cac:PartyIdentification><cbc:ID>ORG-0001</cbc:ID></cac:PartyIdentification>
        <cac:PartyName><cbc:Name>Stadt Beispiel</cbc:Name></cac:PartyName>
        <cac:PostalAddress>
          <cac:Country><cbc:IdentificationCode>DE</cbc:IdentificationCode></cac:Country>
        </cac:PostalAddress>
      </efac:Company>
    </efac:Organization>
    <efac:Organization>
      <efac:Company>
        <cac:PartyIdentification><cbc:ID>ORG-0002</cbc:ID></cac:PartyIdentification>
        <cac:PartyName><cbc:Name>Baufirma GmbH</cbc:Name></cac:PartyName>
      </efac:Company>
    </efac:Organization>
  </efac:Organizations>
  <efac:NoticeResult>
    <efac:LotTender>
      <cbc:ID>TEN-0001</cbc:ID>
      <cac:LegalMonetaryTotal><cbc:PayableAmount currencyID="EUR">100000</cbc:PayableAmount></cac:LegalMonetaryTotal>
      <efac:TenderingParty><cbc:ID>PTY-0001</cbc:ID></efac:TenderingParty>
    </efac:LotTender>
    <efac:TenderingParty>
      <cbc:ID>PTY-0001</cbc:ID>
      <efac:Tenderer><cbc:ID>ORG-0002</cbc:ID></efac:Tenderer>
    </efac:TenderingParty>
    <efac:SettledContract>
      <cbc:ID>CON-0001</cbc:ID>
      <cbc:Title>Road works lot 1</cbc:Title>
    </efac:SettledContract>
    <efac:LotResult>
      <efac:TenderLot><cbc:ID>LOT-0001</cbc:ID></efac:TenderLot>
      <efac:LotTender><cbc:ID>TEN-0001</cbc:ID></efac:LotTender>
      <efac:SettledContract><cbc:ID>CON-0001</cbc:ID></efac:SettledContract>
    </efac:LotResult>
  </efac:NoticeResult>
</ContractAwardNotice>"#;

    #[test]
    fn parses_ubl_sample_notice() {
        let doc = Document::parse(SAMPLE).unwrap();
        let notice = parse(doc.root_element(), "000123_2024").unwrap().unwrap();
        assert_eq!(notice.document.doc_id, "000123-2024");
        assert_eq!(notice.buyer.official_name, "Stadt Beispiel");
        assert_eq!(notice.awards.len(), 1);
        assert_eq!(notice.awards[0].awarded_value, Some(100000.0));
        assert_eq!(notice.awards[0].contractors[0].official_name, "Baufirma GmbH");
        assert_eq!(notice.awards[0].contract_number, None);
    }
}
